use crate::core::io::error::{MolfileError, ParseErrorKind};
use crate::core::io::ctfile::v3000::{V30_PREFIX, fold};

/// Accumulates output lines of a CTfile document.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    text: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    /// Writes a V3000 record, folding it at 70 characters.
    pub fn v30(&mut self, body: &str) {
        let logical = format!("{V30_PREFIX}{body}");
        self.line(&fold(&logical));
    }

    /// Appends already terminated text.
    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Right-aligns `value` in a field of `width` characters.
///
/// Values that do not fit would shift every following column, so they are
/// rejected instead of truncated.
pub(crate) fn padded_number(value: i64, width: usize, field: &str) -> Result<String, MolfileError> {
    let text = value.to_string();
    if text.len() > width {
        return Err(MolfileError::LossyEncoding(format!(
            "{field} value {value} does not fit in {width} columns"
        )));
    }
    Ok(format!("{text:>width$}"))
}

/// Left-aligns `text` in a field of `width` characters.
pub(crate) fn padded_text(text: &str, width: usize, field: &str) -> Result<String, MolfileError> {
    if text.chars().count() > width {
        return Err(MolfileError::LossyEncoding(format!(
            "{field} '{text}' does not fit in {width} columns"
        )));
    }
    Ok(format!("{text:<width$}"))
}

/// Formats a number with fixed precision, never printing a negative zero.
pub(crate) fn format_decimal(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$}");
    match text.strip_prefix('-') {
        Some(magnitude) if magnitude.chars().all(|c| c == '0' || c == '.') => magnitude.to_string(),
        _ => text,
    }
}

/// Right-aligns a fixed-precision number in a field of `width` characters.
pub(crate) fn padded_float(
    value: f64,
    width: usize,
    precision: usize,
    field: &str,
) -> Result<String, MolfileError> {
    let text = format_decimal(value, precision);
    if text.len() > width {
        return Err(MolfileError::LossyEncoding(format!(
            "{field} value {text} does not fit in {width} columns"
        )));
    }
    Ok(format!("{text:>width$}"))
}

pub(crate) fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len()))
        .or_else(|| line.get(start..))
        .unwrap_or("")
        .trim()
}

fn columns(start: usize, end: usize) -> String {
    format!("{}-{}", start + 1, end)
}

/// Parses an integer column; an empty column reads as zero.
pub(crate) fn parse_int_field(
    line: &str,
    start: usize,
    end: usize,
    line_no: usize,
) -> Result<i64, MolfileError> {
    let value = slice_and_trim(line, start, end);
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| {
        MolfileError::parse(
            line_no,
            ParseErrorKind::InvalidInt {
                columns: columns(start, end),
                value: value.to_string(),
            },
        )
    })
}

pub(crate) fn parse_float_field(
    line: &str,
    start: usize,
    end: usize,
    line_no: usize,
) -> Result<f64, MolfileError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| {
        MolfileError::parse(
            line_no,
            ParseErrorKind::InvalidFloat {
                columns: columns(start, end),
                value: value.to_string(),
            },
        )
    })
}

/// Parses a whitespace-separated integer token.
pub(crate) fn parse_int_token(token: &str, what: &str, line_no: usize) -> Result<i64, MolfileError> {
    token.parse().map_err(|_| {
        MolfileError::parse(
            line_no,
            ParseErrorKind::UnexpectedToken {
                expected: format!("integer {what}"),
                found: token.to_string(),
            },
        )
    })
}

pub(crate) fn parse_float_token(token: &str, what: &str, line_no: usize) -> Result<f64, MolfileError> {
    token.parse().map_err(|_| {
        MolfileError::parse(
            line_no,
            ParseErrorKind::UnexpectedToken {
                expected: format!("number {what}"),
                found: token.to_string(),
            },
        )
    })
}

/// Converts a 1-based file index into `usize`, rejecting zero and negatives.
pub(crate) fn parse_index(token: &str, what: &'static str, line_no: usize) -> Result<usize, MolfileError> {
    let value = parse_int_token(token, what, line_no)?;
    usize::try_from(value)
        .ok()
        .filter(|&index| index > 0)
        .ok_or_else(|| {
            MolfileError::parse(
                line_no,
                ParseErrorKind::IndexOutOfRange {
                    what,
                    index: value.max(0) as usize,
                },
            )
        })
}
