use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MolfileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },
    #[error("Malformed document: {0}")]
    Malformed(String),
    #[error("Unsupported combination: {0}")]
    Unsupported(String),
    #[error("{count} invalid S-group(s) detected (first: {first})")]
    InvalidSGroups { count: usize, first: SGroupError },
    #[error("Lossy encoding: {0}")]
    LossyEncoding(String),
}

impl MolfileError {
    pub(crate) fn parse(line: usize, kind: ParseErrorKind) -> Self {
        Self::Parse { line, kind }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short (expected at least {expected} chars)")]
    LineTooShort { expected: usize },
    #[error("Expected {expected}, found '{found}'")]
    UnexpectedToken { expected: String, found: String },
    #[error("Unknown S-group type '{0}'")]
    UnknownSGroupType(String),
    #[error("{what} index {index} is out of range")]
    IndexOutOfRange { what: &'static str, index: usize },
    #[error("Block '{0}' is not terminated")]
    UnbalancedBlock(String),
    #[error("Continuation line expected after trailing '-'")]
    DanglingContinuation,
    #[error("Invalid atom list '{0}'")]
    InvalidAtomList(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

/// Diagnosis of an S-group that cannot be saved.
///
/// `index` is the group's 1-based breadth-first sequence number, the number
/// it would have carried in the output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SGroupError {
    #[error("S-group {index} ({tag}) references a missing atom")]
    MissingAtom { index: usize, tag: &'static str },
    #[error("S-group {index} ({tag}) must have 0 or 2 crossing bonds, found {found}")]
    CrossingBonds {
        index: usize,
        tag: &'static str,
        found: usize,
    },
    #[error("S-group {index} (MUL) has {atoms} atoms, which is not a multiple of {multiplier}")]
    MultiplierMismatch {
        index: usize,
        atoms: usize,
        multiplier: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_message_names_line_and_columns() {
        let error = MolfileError::parse(
            5,
            ParseErrorKind::InvalidFloat {
                columns: "1-10".into(),
                value: "abc".into(),
            },
        );
        assert_eq!(
            error.to_string(),
            "Parse error on line 5: Invalid float format in columns 1-10 (value: 'abc')"
        );
    }

    #[test]
    fn invalid_sgroups_message_reports_count_and_first_failure() {
        let error = MolfileError::InvalidSGroups {
            count: 2,
            first: SGroupError::CrossingBonds {
                index: 1,
                tag: "SRU",
                found: 3,
            },
        };
        assert_eq!(
            error.to_string(),
            "2 invalid S-group(s) detected (first: S-group 1 (SRU) must have 0 or 2 crossing bonds, found 3)"
        );
    }
}
