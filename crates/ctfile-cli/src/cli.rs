use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ctfile - read, inspect and convert MDL CTfiles (V2000/V3000 molfiles, $RXN and $MDL R-group files).",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used for batch conversion.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert one or more CTfiles, re-encoding them with the chosen dialect and options.
    Convert(ConvertArgs),
    /// Print a summary of a CTfile's contents.
    Info(InfoArgs),
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input file(s). With more than one input, `--output` names a directory.
    #[arg(short, long, required = true, num_args(1..), value_name = "PATH")]
    pub input: Vec<PathBuf>,

    /// Output file, or output directory for several inputs.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a TOML file with save options.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub dialect: DialectFlags,

    /// Drop S-groups that cannot be saved instead of failing.
    #[arg(long)]
    pub skip_sgroup_errors: bool,

    /// Write only the scaffold of structures carrying R-groups.
    #[arg(long)]
    pub suppress_rgroups: bool,

    /// Keep internal descriptor data S-groups in the output.
    #[arg(long)]
    pub preserve_internal_descriptors: bool,

    /// Program name written on the second header line (at most 8 characters).
    #[arg(long, value_name = "NAME")]
    pub program_name: Option<String>,

    /// Set a save option, overriding the config file.
    /// Can be used multiple times. Example: -S dialect=v3000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Mutually exclusive dialect overrides.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct DialectFlags {
    /// Write the V3000 (extended) dialect.
    #[arg(long)]
    pub v3000: bool,
    /// Write the V2000 (fixed-column) dialect.
    #[arg(long)]
    pub v2000: bool,
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// The CTfile to inspect.
    #[arg(required = true, value_name = "PATH")]
    pub file: PathBuf,

    /// Print the summary as a TOML table.
    #[arg(long)]
    pub toml: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_accepts_several_inputs_and_flags() {
        let cli = Cli::parse_from([
            "ctfile",
            "-vv",
            "convert",
            "-i",
            "a.mol",
            "b.mol",
            "-o",
            "out",
            "--v3000",
            "--skip-sgroup-errors",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.input.len(), 2);
        assert!(args.dialect.v3000);
        assert!(!args.dialect.v2000);
        assert!(args.skip_sgroup_errors);
        assert!(!args.suppress_rgroups);
    }

    #[test]
    fn dialect_flags_are_exclusive() {
        let result = Cli::try_parse_from([
            "ctfile", "convert", "-i", "a.mol", "-o", "b.mol", "--v3000", "--v2000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["ctfile", "-q", "-v", "info", "a.mol"]).is_err());
    }
}
