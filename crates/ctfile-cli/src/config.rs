use crate::cli::{ConvertArgs, DialectFlags};
use crate::error::{CliError, Result};
use ctfile::{Dialect, SaveOptions};
use std::path::Path;
use tracing::debug;

/// Save options as loaded from a config file, before command-line overrides.
#[derive(Debug, Default, Clone)]
pub struct FileSaveConfig {
    options: SaveOptions,
}

impl FileSaveConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading save options from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let options = SaveOptions::from_toml_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Ok(Self { options })
    }

    /// Loads `path` when given, otherwise starts from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies `--set` values, then the dedicated flags; the command line
    /// wins over the file.
    pub fn merge_with_cli(mut self, args: &ConvertArgs) -> Result<SaveOptions> {
        self.apply_set_values(&args.set_values)?;

        let file = self.options;
        let mut builder = SaveOptions::builder()
            .dialect(Self::merge_dialect(args.dialect, file.dialect))
            .skip_sgroup_errors(args.skip_sgroup_errors || file.skip_sgroup_errors)
            .suppress_rgroups(args.suppress_rgroups || file.suppress_rgroups)
            .preserve_internal_descriptors(
                args.preserve_internal_descriptors || file.preserve_internal_descriptors,
            )
            .program_name(args.program_name.clone().unwrap_or(file.program_name));
        if let Some(timestamp) = file.timestamp {
            builder = builder.timestamp(timestamp);
        }
        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_dialect(flags: DialectFlags, file_value: Dialect) -> Dialect {
        if flags.v3000 {
            Dialect::V3000
        } else if flags.v2000 {
            Dialect::V2000
        } else {
            file_value
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let parse_bool = |value: &str| {
                value.parse::<bool>().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value))
                })
            };

            match key {
                "dialect" => {
                    self.options.dialect = value_str
                        .parse()
                        .map_err(|e| CliError::Config(format!("{}: {}", e, value_str)))?;
                }
                "skip-sgroup-errors" => self.options.skip_sgroup_errors = parse_bool(value_str)?,
                "suppress-rgroups" => self.options.suppress_rgroups = parse_bool(value_str)?,
                "preserve-internal-descriptors" => {
                    self.options.preserve_internal_descriptors = parse_bool(value_str)?
                }
                "program-name" => self.options.program_name = value_str.to_string(),
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
