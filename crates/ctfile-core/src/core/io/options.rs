use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of the program-name field on the second header line.
pub const PROGRAM_NAME_WIDTH: usize = 8;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Failed to parse options: {0}")]
    Toml(String),
}

/// The CTfile dialect to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    V2000,
    V3000,
}

#[derive(Debug, Error)]
#[error("Invalid dialect string (expected 'v2000' or 'v3000')")]
pub struct ParseDialectError;

impl FromStr for Dialect {
    type Err = ParseDialectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v2000" | "2000" => Ok(Self::V2000),
            "v3000" | "3000" => Ok(Self::V3000),
            _ => Err(ParseDialectError),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2000 => write!(f, "V2000"),
            Self::V3000 => write!(f, "V3000"),
        }
    }
}

/// Options controlling how a structure is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct SaveOptions {
    pub dialect: Dialect,
    /// Prune S-groups that fail save preparation instead of failing.
    pub skip_sgroup_errors: bool,
    /// Write only the scaffold of a structure with R-groups (V2000).
    pub suppress_rgroups: bool,
    /// Keep `INDIGO_*_DESC` data S-groups.
    pub preserve_internal_descriptors: bool,
    /// Program name written on the second header line.
    pub program_name: String,
    /// Fixed header timestamp; the current local time when unset.
    pub timestamp: Option<NaiveDateTime>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::V2000,
            skip_sgroup_errors: false,
            suppress_rgroups: false,
            preserve_internal_descriptors: false,
            program_name: "ctfile".to_string(),
            timestamp: None,
        }
    }
}

impl SaveOptions {
    pub fn builder() -> SaveOptionsBuilder {
        SaveOptionsBuilder::new()
    }

    pub fn v3000() -> Self {
        Self {
            dialect: Dialect::V3000,
            ..Self::default()
        }
    }

    /// Parses options from a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(content).map_err(|e| ConfigError::Toml(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.program_name.chars().count() > PROGRAM_NAME_WIDTH {
            return Err(ConfigError::InvalidParameter {
                name: "program_name",
                reason: format!(
                    "'{}' is longer than {} characters",
                    self.program_name, PROGRAM_NAME_WIDTH
                ),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct SaveOptionsBuilder {
    dialect: Option<Dialect>,
    skip_sgroup_errors: Option<bool>,
    suppress_rgroups: Option<bool>,
    preserve_internal_descriptors: Option<bool>,
    program_name: Option<String>,
    timestamp: Option<NaiveDateTime>,
}

impl SaveOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }
    pub fn skip_sgroup_errors(mut self, skip: bool) -> Self {
        self.skip_sgroup_errors = Some(skip);
        self
    }
    pub fn suppress_rgroups(mut self, suppress: bool) -> Self {
        self.suppress_rgroups = Some(suppress);
        self
    }
    pub fn preserve_internal_descriptors(mut self, preserve: bool) -> Self {
        self.preserve_internal_descriptors = Some(preserve);
        self
    }
    pub fn program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }
    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Result<SaveOptions, ConfigError> {
        let defaults = SaveOptions::default();
        let options = SaveOptions {
            dialect: self.dialect.unwrap_or(defaults.dialect),
            skip_sgroup_errors: self.skip_sgroup_errors.unwrap_or(defaults.skip_sgroup_errors),
            suppress_rgroups: self.suppress_rgroups.unwrap_or(defaults.suppress_rgroups),
            preserve_internal_descriptors: self
                .preserve_internal_descriptors
                .unwrap_or(defaults.preserve_internal_descriptors),
            program_name: self.program_name.unwrap_or(defaults.program_name),
            timestamp: self.timestamp.or(defaults.timestamp),
        };
        options.validate()?;
        Ok(options)
    }
}
