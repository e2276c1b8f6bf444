//! CTfile text to structure.

mod ctab2000;
mod ctab3000;
mod reaction;
mod rgroup;
mod sgroup;

use super::primitives::parse_int_token;
use super::v3000::{V30_PREFIX, unfold};
use crate::core::io::error::{MolfileError, ParseErrorKind};
use crate::core::models::builder::BuildError;
use crate::core::models::structure::Structure;
use tracing::debug;

/// Sequential access to the physical lines of a document, tracking line
/// numbers for error reports.
pub(super) struct LineCursor<'a> {
    lines: Vec<&'a str>,
    position: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            position: 0,
        }
    }

    /// 1-based number of the most recently consumed line.
    pub fn line_no(&self) -> usize {
        self.position.max(1)
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.position).copied()
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.lines.len()
    }

    pub fn next_line(&mut self, what: &str) -> Result<&'a str, MolfileError> {
        let line = self.lines.get(self.position).copied().ok_or_else(|| {
            MolfileError::parse(
                self.position + 1,
                ParseErrorKind::MissingRecord(what.to_string()),
            )
        })?;
        self.position += 1;
        Ok(line)
    }

    /// Consumes a line that must read `expected` (surrounding blanks ignored).
    pub fn expect(&mut self, expected: &str) -> Result<(), MolfileError> {
        let line = self.next_line(expected)?;
        if line.trim() == expected {
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: line.to_string(),
            }))
        }
    }

    /// Consumes one logical `M  V30` record, unfolding continuation lines,
    /// and returns its body without the prefix.
    pub fn next_v30(&mut self) -> Result<String, MolfileError> {
        let start = self.position;
        let mut end = start;
        loop {
            let line = self.lines.get(end).ok_or_else(|| {
                MolfileError::parse(end + 1, ParseErrorKind::DanglingContinuation)
            })?;
            end += 1;
            if !line.ends_with('-') {
                break;
            }
        }
        self.position = end;
        let logical = unfold(self.lines[start..end].iter().copied())
            .map_err(|kind| MolfileError::parse(start + 1, kind))?;
        match logical.strip_prefix(V30_PREFIX) {
            Some(body) => Ok(body.trim().to_string()),
            None => Err(MolfileError::parse(
                start + 1,
                ParseErrorKind::UnexpectedToken {
                    expected: "M  V30 record".to_string(),
                    found: logical,
                },
            )),
        }
    }

    /// Skips V3000 records up to and including `END <block>`.
    pub fn skip_block(&mut self, block: &str) -> Result<(), MolfileError> {
        let terminator = format!("END {block}");
        loop {
            if self.is_at_end() {
                return Err(self.error(ParseErrorKind::UnbalancedBlock(block.to_string())));
            }
            if self.next_v30()? == terminator {
                return Ok(());
            }
        }
    }

    pub fn error(&self, kind: ParseErrorKind) -> MolfileError {
        MolfileError::parse(self.line_no(), kind)
    }
}

pub(super) fn rgroup_out_of_range(number: i64, line: usize) -> MolfileError {
    MolfileError::parse(
        line,
        ParseErrorKind::IndexOutOfRange {
            what: "R-group",
            index: number.max(0) as usize,
        },
    )
}

pub(super) fn build_error(line: usize, error: BuildError) -> MolfileError {
    match error {
        BuildError::AtomIndexOutOfRange(index) => MolfileError::parse(
            line,
            ParseErrorKind::IndexOutOfRange {
                what: "atom",
                index,
            },
        ),
        other => MolfileError::Malformed(format!("line {line}: {other}")),
    }
}

/// Parses a 1-based index token and checks it against a table size.
pub(super) fn parse_bounded_index(
    token: &str,
    what: &'static str,
    limit: usize,
    line: usize,
) -> Result<usize, MolfileError> {
    let value = parse_int_token(token, what, line)?;
    match usize::try_from(value) {
        Ok(index) if (1..=limit).contains(&index) => Ok(index),
        _ => Err(MolfileError::parse(
            line,
            ParseErrorKind::IndexOutOfRange {
                what,
                index: value.max(0) as usize,
            },
        )),
    }
}

/// Reads a single molfile, V2000 or V3000, starting at its header block.
pub(super) fn read_molfile(cursor: &mut LineCursor) -> Result<Structure, MolfileError> {
    let name = cursor.next_line("molfile name")?.trim_end().to_string();
    cursor.next_line("molfile program line")?;
    cursor.next_line("molfile comment line")?;
    let counts = cursor.peek().unwrap_or_default();

    let mut structure = if counts.contains("V3000") {
        cursor.next_line("counts line")?;
        debug!("Reading V3000 molfile '{}'", name);
        ctab3000::read_body3000(cursor)?
    } else {
        debug!("Reading V2000 molfile '{}'", name);
        let ctab = ctab2000::read_ctab2000(cursor)?;
        let mut structure = ctab.structure;
        for (number, logic) in ctab.logic {
            structure.insert_rgroup(number, logic);
        }
        structure
    };
    structure.name = name;
    Ok(structure)
}

/// Parses a molfile, an R-group file or a reaction file.
///
/// The document kind is detected from the first line: `$RXN` starts a
/// reaction (V3000 when the line says so), `$MDL` an R-group file, anything
/// else a molfile. Fragments are marked on the result.
pub fn parse(text: &str) -> Result<Structure, MolfileError> {
    let mut cursor = LineCursor::new(text);
    let first = cursor
        .peek()
        .ok_or_else(|| MolfileError::Malformed("document is empty".to_string()))?;

    let mut structure = if first.starts_with("$RXN") {
        if first.contains("V3000") {
            reaction::read_reaction3000(&mut cursor)?
        } else {
            reaction::read_reaction2000(&mut cursor)?
        }
    } else if first.starts_with("$MDL") {
        rgroup::read_rgfile2000(&mut cursor)?
    } else {
        read_molfile(&mut cursor)?
    };
    structure.mark_fragments();
    Ok(structure)
}
