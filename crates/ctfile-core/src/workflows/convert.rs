use crate::core::io::ctfile::MolfileFormat;
use crate::core::io::error::MolfileError;
use crate::core::io::options::SaveOptions;
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use serde::Serialize;
use std::path::Path;
use tracing::{info, instrument};

/// Counts describing a decoded structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StructureSummary {
    pub atoms: usize,
    pub bonds: usize,
    pub sgroups: usize,
    pub rgroups: usize,
    pub arrows: usize,
    pub pluses: usize,
    pub stereo_groups: usize,
}

impl StructureSummary {
    pub fn of(structure: &Structure) -> Self {
        Self {
            atoms: structure.atom_count(),
            bonds: structure.bond_count(),
            sgroups: structure.sgroup_count(),
            rgroups: structure.rgroup_count(),
            arrows: structure.arrows().len(),
            pluses: structure.pluses().len(),
            stereo_groups: structure.enhanced_stereo().group_count(),
        }
    }
}

/// Reads a molfile, `$RXN` or `$MDL` document from `path`.
#[instrument(skip_all, name = "read_workflow")]
pub fn read_path(path: impl AsRef<Path>) -> Result<Structure, MolfileError> {
    let path = path.as_ref();
    let structure = MolfileFormat::read_from_path(path)?;
    info!(
        "Read '{}': {} atoms, {} bonds.",
        path.display(),
        structure.atom_count(),
        structure.bond_count()
    );
    Ok(structure)
}

/// Encodes `structure` and writes it to `path`.
///
/// The document is fully encoded before the file is created, so an encoding
/// failure leaves any existing file untouched.
#[instrument(skip_all, name = "write_workflow")]
pub fn write_path(
    structure: &Structure,
    options: &SaveOptions,
    path: impl AsRef<Path>,
) -> Result<(), MolfileError> {
    let path = path.as_ref();
    let text = crate::core::io::ctfile::serialize(structure, options)?;
    std::fs::write(path, text)?;
    info!("Wrote '{}' as {}.", path.display(), options.dialect);
    Ok(())
}

/// Reads `input` and writes it to `output` with `options`, returning the
/// summary of what was converted.
#[instrument(skip_all, name = "convert_workflow")]
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &SaveOptions,
) -> Result<StructureSummary, MolfileError> {
    let structure = read_path(input)?;
    write_path(&structure, options, output)?;
    Ok(StructureSummary::of(&structure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::options::Dialect;
    use std::fs;
    use tempfile::tempdir;

    const ACETIC_ACID: &str = "\
acetic acid
  ctfile  01012500002D

  4  3  0  0  0  0            999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.2990    0.7500    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    2.5981    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
    1.2990    2.2500    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  2  3  1  0
  2  4  2  0
M  END
";

    #[test]
    fn convert_rewrites_v2000_as_v3000() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("acetic.mol");
        let output = dir.path().join("acetic_v3.mol");
        fs::write(&input, ACETIC_ACID).unwrap();

        let summary = convert(&input, &output, &SaveOptions::v3000()).unwrap();
        assert_eq!(summary.atoms, 4);
        assert_eq!(summary.bonds, 3);
        assert_eq!(summary.sgroups, 0);

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("M  V30 BEGIN CTAB"));
        assert!(written.contains("M  V30 COUNTS 4 3 0 0 0"));

        let reread = read_path(&output).unwrap();
        assert_eq!(reread.name, "acetic acid");
        assert_eq!(StructureSummary::of(&reread), summary);
    }

    #[test]
    fn read_path_reports_missing_file_as_io_error() {
        let dir = tempdir().unwrap();
        let result = read_path(dir.path().join("absent.mol"));
        assert!(matches!(result, Err(MolfileError::Io(_))));
    }

    #[test]
    fn write_path_leaves_existing_file_on_encoding_failure() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("big.mol");
        fs::write(&output, "previous").unwrap();

        let mut structure = Structure::new();
        for i in 0..1000 {
            structure.add_atom(crate::core::models::atom::Atom::new(
                "C",
                nalgebra::Point3::new(i as f64, 0.0, 0.0),
            ));
        }
        let options = SaveOptions::builder()
            .dialect(Dialect::V2000)
            .build()
            .unwrap();
        assert!(write_path(&structure, &options, &output).is_err());
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous");
    }
}
