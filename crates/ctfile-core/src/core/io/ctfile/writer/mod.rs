//! Structure to CTfile text.

mod ctab2000;
mod ctab3000;
mod reaction;
mod rgroup;
mod sgroup;
mod stereo;

use super::prepare::prepare_for_save;
use super::primitives::LineBuffer;
use crate::core::io::error::MolfileError;
use crate::core::io::options::{Dialect, SaveOptions};
use crate::core::models::structure::Structure;
use chrono::Local;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, warn};

/// Text shared by every header written during one save.
pub(super) struct Header {
    program: String,
    stamp: String,
}

impl Header {
    pub fn from_options(options: &SaveOptions) -> Self {
        let timestamp = options
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());
        Self {
            program: options.program_name.clone(),
            stamp: timestamp.format("%m%d%y%H%M").to_string(),
        }
    }

    pub fn write_v2000(&self, buf: &mut LineBuffer, name: &str) {
        buf.line(name);
        buf.line(&format!(
            "  {:<8}{}2D 1   1.00000     0.00000     0",
            self.program, self.stamp
        ));
        buf.blank();
    }

    pub fn write_v3000(&self, buf: &mut LineBuffer, name: &str) {
        buf.line(name);
        buf.line(&format!("  {}", self.program));
        buf.blank();
        buf.line("  0  0  0     0  0            999 V3000");
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// Resolves ids to their 1-based file numbers.
pub(super) fn numbered<K: Copy + Eq + Hash>(
    numbering: &HashMap<K, usize>,
    ids: &[K],
    what: &str,
) -> Result<Vec<usize>, MolfileError> {
    ids.iter()
        .map(|id| {
            numbering
                .get(id)
                .copied()
                .ok_or_else(|| MolfileError::Malformed(format!("reference to a missing {what}")))
        })
        .collect()
}

/// A complete V2000 molfile: header block followed by the connection table.
pub(super) fn write_molfile2000(
    buf: &mut LineBuffer,
    structure: &Structure,
    header: &Header,
) -> Result<(), MolfileError> {
    if !structure.enhanced_stereo().is_empty() {
        warn!(
            "Dropping {} enhanced stereo group(s): V2000 cannot encode them",
            structure.enhanced_stereo().group_count()
        );
    }
    header.write_v2000(buf, &structure.name);
    ctab2000::write_ctab2000(buf, structure, &[])
}

/// Serializes `structure` according to `options`.
///
/// The caller's structure is never modified; S-group preparation works on a
/// private copy.
pub fn serialize(structure: &Structure, options: &SaveOptions) -> Result<String, MolfileError> {
    if structure.arrows().len() > 1 {
        return Err(MolfileError::Unsupported(
            "a reaction may not contain more than one arrow".to_string(),
        ));
    }
    if structure.is_reaction() && structure.rgroup_count() > 0 {
        return Err(MolfileError::Unsupported(
            "reactions with R-groups are not supported".to_string(),
        ));
    }

    let prepared = prepare_for_save(structure, options)?;
    let header = Header::from_options(options);
    let mut buf = LineBuffer::new();

    if prepared.is_reaction() {
        debug!("Writing {} reaction", options.dialect);
        match options.dialect {
            Dialect::V2000 => reaction::write_reaction2000(&mut buf, &prepared, &header)?,
            Dialect::V3000 => reaction::write_reaction3000(&mut buf, &prepared, &header)?,
        }
        return Ok(buf.into_string());
    }

    let has_rgroups = prepared.rgroup_count() > 0;
    match options.dialect {
        Dialect::V2000 if has_rgroups && !options.suppress_rgroups => {
            debug!("Writing V2000 R-group file with {} R-group(s)", prepared.rgroup_count());
            rgroup::write_rgfile2000(&mut buf, &prepared)?;
        }
        Dialect::V2000 => {
            let target = if has_rgroups { prepared.scaffold() } else { prepared };
            write_molfile2000(&mut buf, &target, &header)?;
        }
        Dialect::V3000 => {
            header.write_v3000(&mut buf, &prepared.name);
            if has_rgroups {
                ctab3000::write_ctab3000(&mut buf, &prepared.scaffold())?;
                if !options.suppress_rgroups {
                    rgroup::write_rgroups3000(&mut buf, &prepared)?;
                }
            } else {
                ctab3000::write_ctab3000(&mut buf, &prepared)?;
            }
            buf.line("M  END");
        }
    }
    Ok(buf.into_string())
}
