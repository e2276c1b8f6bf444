//! Lexical layer of the V3000 dialect: line folding, value quoting and
//! tokenization of `M  V30` records.

use crate::core::io::error::ParseErrorKind;
use std::borrow::Cow;

pub(crate) const V30_PREFIX: &str = "M  V30 ";
/// Maximum number of characters of a logical line per physical line.
pub(crate) const FOLD_WIDTH: usize = 70;
const CONTINUATION: &str = "-\nM  V30 ";

/// Splits a logical line (prefix included) into 70-character chunks joined
/// by a continuation dash and a fresh record prefix.
pub(crate) fn fold(logical: &str) -> String {
    let chars: Vec<char> = logical.chars().collect();
    chars
        .chunks(FOLD_WIDTH)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(CONTINUATION)
}

/// Re-joins folded physical lines into the logical line they came from.
pub(crate) fn unfold<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<String, ParseErrorKind> {
    let mut logical = String::new();
    let mut pending = false;
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 && !pending {
            break;
        }
        let content = if i == 0 {
            line
        } else {
            line.strip_prefix(V30_PREFIX)
                .ok_or(ParseErrorKind::DanglingContinuation)?
        };
        match content.strip_suffix('-') {
            Some(head) => {
                logical.push_str(head);
                pending = true;
            }
            None => {
                logical.push_str(content);
                pending = false;
            }
        }
    }
    if pending {
        return Err(ParseErrorKind::DanglingContinuation);
    }
    Ok(logical)
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.ends_with('-')
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '(' | ')' | '='))
}

/// Quotes a value for a V3000 record when it would not survive tokenization
/// bare. Embedded double quotes are doubled.
pub(crate) fn quote(value: &str) -> Cow<'_, str> {
    if needs_quotes(value) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// A token of a V3000 record body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Positional(String),
    Keyword(String, String),
}

/// Splits a record body into positional values and `KEY=value` pairs.
///
/// Quoted values may contain spaces (`""` is a literal quote), and
/// parenthesized lists are kept whole, parentheses included.
pub(crate) fn tokenize(body: &str) -> Result<Vec<Token>, ParseErrorKind> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut current = String::new();
        let mut key: Option<String> = None;
        let mut in_quotes = false;
        let mut was_quoted = false;
        let mut depth = 0usize;

        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    if chars.next_if_eq(&'"').is_some() {
                        current.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    current.push(c);
                }
                continue;
            }
            match c {
                '"' => {
                    in_quotes = true;
                    was_quoted = true;
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth = depth.checked_sub(1).ok_or_else(|| ParseErrorKind::UnexpectedToken {
                        expected: "balanced parentheses".into(),
                        found: body.to_string(),
                    })?;
                    current.push(c);
                }
                '=' if depth == 0 && key.is_none() && !was_quoted => {
                    key = Some(std::mem::take(&mut current));
                }
                ' ' | '\t' if depth == 0 => break,
                _ => current.push(c),
            }
        }

        if in_quotes || depth != 0 {
            return Err(ParseErrorKind::UnexpectedToken {
                expected: "closed quote or parenthesis".into(),
                found: body.to_string(),
            });
        }
        tokens.push(match key {
            Some(key) => Token::Keyword(key.to_ascii_uppercase(), current),
            None => Token::Positional(current),
        });
    }
    Ok(tokens)
}

/// Parses a counted list value such as `(3 1 2 5)` into its items.
pub(crate) fn parse_list(value: &str) -> Result<Vec<String>, ParseErrorKind> {
    let invalid = || ParseErrorKind::UnexpectedToken {
        expected: "counted list '(n ...)'".into(),
        found: value.to_string(),
    };
    let inner = value
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(invalid)?;
    let mut items = inner.split_whitespace();
    let count: usize = items.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let items: Vec<String> = items.map(str::to_string).collect();
    if items.len() < count {
        return Err(invalid());
    }
    Ok(items.into_iter().take(count).collect())
}

/// Formats a counted list value.
pub(crate) fn format_list<T: ToString>(items: &[T]) -> String {
    let mut text = format!("({}", items.len());
    for item in items {
        text.push(' ');
        text.push_str(&item.to_string());
    }
    text.push(')');
    text
}

/// Positional values and keywords of one record, split for lookup.
#[derive(Debug, Default)]
pub(crate) struct Record {
    pub positional: Vec<String>,
    pub keywords: Vec<(String, String)>,
}

impl Record {
    pub fn parse(body: &str) -> Result<Self, ParseErrorKind> {
        let mut record = Self::default();
        for token in tokenize(body)? {
            match token {
                Token::Positional(value) => record.positional.push(value),
                Token::Keyword(key, value) => record.keywords.push((key, value)),
            }
        }
        Ok(record)
    }

    /// First value of a keyword.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a keyword that may repeat (e.g. `BRKXYZ`).
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.keywords
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }
}
