use super::ids::AtomId;
use std::collections::{BTreeMap, HashMap};

/// Enhanced stereo annotation of a structure.
///
/// Pool labels of the relative (`OR`) and racemic (`AND`) collections are
/// chosen by whoever builds the structure; the codec only carries them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnhancedStereo {
    /// Atoms with absolute configuration.
    pub absolute: Vec<AtomId>,
    /// Relative stereo groups keyed by label.
    pub relative: BTreeMap<u32, Vec<AtomId>>,
    /// Racemic stereo groups keyed by label.
    pub racemic: BTreeMap<u32, Vec<AtomId>>,
}

impl EnhancedStereo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.absolute.is_empty() && self.relative.is_empty() && self.racemic.is_empty()
    }

    /// Number of collection records this annotation serializes to.
    pub fn group_count(&self) -> usize {
        usize::from(!self.absolute.is_empty()) + self.relative.len() + self.racemic.len()
    }

    /// Drops `atom_id` from every collection, removing pools that become empty.
    pub fn remove_atom(&mut self, atom_id: AtomId) {
        self.absolute.retain(|&id| id != atom_id);
        for pool in [&mut self.relative, &mut self.racemic] {
            pool.values_mut().for_each(|atoms| atoms.retain(|&id| id != atom_id));
            pool.retain(|_, atoms| !atoms.is_empty());
        }
    }

    /// Translates atom ids through `map`, dropping atoms without an entry.
    pub fn remapped(&self, map: &HashMap<AtomId, AtomId>) -> Self {
        let remap_list =
            |atoms: &[AtomId]| -> Vec<AtomId> { atoms.iter().filter_map(|id| map.get(id).copied()).collect() };
        let remap_pool = |pool: &BTreeMap<u32, Vec<AtomId>>| -> BTreeMap<u32, Vec<AtomId>> {
            pool.iter()
                .map(|(&label, atoms)| (label, remap_list(atoms)))
                .filter(|(_, atoms)| !atoms.is_empty())
                .collect()
        };
        Self {
            absolute: remap_list(&self.absolute),
            relative: remap_pool(&self.relative),
            racemic: remap_pool(&self.racemic),
        }
    }

    /// Appends all collections of `other` into `self`, merging pools that
    /// share a label.
    pub fn extend(&mut self, other: EnhancedStereo) {
        self.absolute.extend(other.absolute);
        for (label, atoms) in other.relative {
            self.relative.entry(label).or_default().extend(atoms);
        }
        for (label, atoms) in other.racemic {
            self.racemic.entry(label).or_default().extend(atoms);
        }
    }
}
