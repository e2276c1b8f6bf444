//! Save preparation: validates S-groups kind by kind and derives the data
//! the writers need (crossing bonds, representative atoms).

use crate::core::io::error::{MolfileError, SGroupError};
use crate::core::io::options::SaveOptions;
use crate::core::models::ids::SGroupId;
use crate::core::models::sgroup::{SGroup, SGroupKind};
use crate::core::models::structure::Structure;
use tracing::{debug, warn};

impl SGroupError {
    pub fn index(&self) -> usize {
        match self {
            Self::MissingAtom { index, .. }
            | Self::CrossingBonds { index, .. }
            | Self::MultiplierMismatch { index, .. } => *index,
        }
    }
}

fn check_crossing(
    index: usize,
    sgroup: &SGroup,
    crossing: &[crate::core::models::ids::BondId],
) -> Result<(), SGroupError> {
    if crossing.is_empty() || crossing.len() == 2 {
        Ok(())
    } else {
        Err(SGroupError::CrossingBonds {
            index,
            tag: sgroup.tag(),
            found: crossing.len(),
        })
    }
}

/// Validates one group and fills in its derived fields.
fn prepare_sgroup(
    structure: &mut Structure,
    id: SGroupId,
    index: usize,
) -> Result<(), SGroupError> {
    let Some(sgroup) = structure.sgroup(id) else {
        return Ok(());
    };
    if sgroup.atoms.iter().any(|&atom| structure.atom(atom).is_none()) {
        return Err(SGroupError::MissingAtom {
            index,
            tag: sgroup.tag(),
        });
    }

    let crossing = structure.crossing_bonds(&sgroup.atoms);
    let (crossing_bonds, patoms) = match &sgroup.kind {
        SGroupKind::Generic | SGroupKind::Data(_) => return Ok(()),
        SGroupKind::Superatom { .. } => (crossing, None),
        SGroupKind::RepeatUnit { .. } => {
            check_crossing(index, sgroup, &crossing)?;
            (crossing, None)
        }
        SGroupKind::Multiple { multiplier } => {
            check_crossing(index, sgroup, &crossing)?;
            let multiplier = *multiplier;
            let atoms = sgroup.atoms.len();
            if multiplier == 0 || atoms % multiplier as usize != 0 {
                return Err(SGroupError::MultiplierMismatch {
                    index,
                    atoms,
                    multiplier,
                });
            }
            let unit = atoms / multiplier as usize;
            (crossing, Some(sgroup.atoms[..unit].to_vec()))
        }
    };

    if let Some(sgroup) = structure.sgroup_mut(id) {
        sgroup.crossing_bonds = crossing_bonds;
        if patoms.is_some() {
            sgroup.patoms = patoms;
        }
    }
    Ok(())
}

/// Produces the working copy that gets serialized.
///
/// Groups are visited in reverse breadth-first order so children are handled
/// before their parents. Invalid groups fail the whole save unless
/// `skip_sgroup_errors` is set, in which case they are pruned. Internal
/// descriptor data groups are pruned unless explicitly preserved.
pub(crate) fn prepare_for_save(
    structure: &Structure,
    options: &SaveOptions,
) -> Result<Structure, MolfileError> {
    let mut working = structure.clone();
    let order = working.sgroups_bfs();
    let mut errors = Vec::new();
    let mut to_remove = Vec::new();

    for (position, &id) in order.iter().enumerate().rev() {
        let index = position + 1;
        if let Err(error) = prepare_sgroup(&mut working, id, index) {
            if options.skip_sgroup_errors {
                warn!("Omitting invalid S-group: {}", error);
                to_remove.push(id);
            }
            errors.push(error);
            continue;
        }
        let is_descriptor = working
            .sgroup(id)
            .and_then(SGroup::data)
            .is_some_and(|field| field.is_internal_descriptor());
        if is_descriptor && !options.preserve_internal_descriptors {
            debug!("Dropping internal descriptor S-group {}", index);
            to_remove.push(id);
        }
    }

    if !options.skip_sgroup_errors {
        let count = errors.len();
        if let Some(first) = errors.into_iter().min_by_key(SGroupError::index) {
            return Err(MolfileError::InvalidSGroups { count, first });
        }
    }

    for id in to_remove {
        working.remove_sgroup(id);
    }
    Ok(working)
}
