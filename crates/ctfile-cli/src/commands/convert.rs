use crate::cli::ConvertArgs;
use crate::config::FileSaveConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::file_progress;
use ctfile::SaveOptions;
use ctfile::workflows::convert::{self, StructureSummary};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// One input file and where its conversion goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Pairs inputs with output paths. A single input writes to `output`
/// unless it is an existing directory; several inputs always go into the
/// `output` directory under their own file names.
pub fn plan_jobs(inputs: &[PathBuf], output: &Path) -> Result<Vec<ConversionJob>> {
    if let [input] = inputs {
        if !output.is_dir() {
            return Ok(vec![ConversionJob {
                input: input.clone(),
                output: output.to_path_buf(),
            }]);
        }
    }

    if output.exists() && !output.is_dir() {
        return Err(CliError::Argument(format!(
            "'{}' must be a directory when converting several files",
            output.display()
        )));
    }
    std::fs::create_dir_all(output)?;

    inputs
        .iter()
        .map(|input| {
            let file_name = input.file_name().ok_or_else(|| {
                CliError::Argument(format!("'{}' does not name a file", input.display()))
            })?;
            Ok(ConversionJob {
                input: input.clone(),
                output: output.join(file_name),
            })
        })
        .collect()
}

pub fn run(args: ConvertArgs, quiet: bool) -> Result<()> {
    let options = FileSaveConfig::load(args.config.as_deref())?.merge_with_cli(&args)?;
    info!("Writing with options: {:?}", options);

    let jobs = plan_jobs(&args.input, &args.output)?;
    let failed = run_jobs(&jobs, &options, quiet || jobs.len() == 1);

    if failed > 0 {
        return Err(CliError::Batch {
            failed,
            total: jobs.len(),
        });
    }
    Ok(())
}

/// Converts every job in parallel and returns the number of failures.
fn run_jobs(jobs: &[ConversionJob], options: &SaveOptions, hide_progress: bool) -> usize {
    let pb = file_progress(jobs.len() as u64, hide_progress);

    let results: Vec<(&ConversionJob, std::result::Result<StructureSummary, ctfile::MolfileError>)> =
        jobs.par_iter()
            .map(|job| {
                let result = convert::convert(&job.input, &job.output, options);
                pb.inc(1);
                (job, result)
            })
            .collect();
    pb.finish_and_clear();

    let mut failed = 0;
    for (job, result) in results {
        match result {
            Ok(summary) => println!(
                "✓ {} -> {} ({} atoms, {} bonds)",
                job.input.display(),
                job.output.display(),
                summary.atoms,
                summary.bonds
            ),
            Err(e) => {
                failed += 1;
                error!("Failed to convert {:?}: {}", job.input, e);
                eprintln!("✗ {}: {}", job.input.display(), e);
            }
        }
    }
    failed
}
