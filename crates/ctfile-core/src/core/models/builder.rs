use super::atom::Atom;
use super::ids::{AtomId, BondId};
use super::structure::Structure;
use super::topology::{Bond, BondType};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Atom index {0} is out of range")]
    AtomIndexOutOfRange(usize),
    #[error("Bond {begin}-{end} is invalid (duplicate endpoint or self-loop)")]
    InvalidBond { begin: usize, end: usize },
}

/// Builds a [`Structure`] from records addressed by 1-based file indices.
///
/// Every atom and bond pushed through the builder is remembered under its
/// 1-based position so later records (bonds, property lists, S-groups) can
/// refer to it the way CTfiles do.
#[derive(Debug, Default)]
pub struct StructureBuilder {
    structure: Structure,
    atoms: Vec<AtomId>,
    bonds: Vec<BondId>,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.structure.name = name.to_string();
        self
    }

    pub fn chiral(&mut self, is_chiral: bool) -> &mut Self {
        self.structure.is_chiral = is_chiral;
        self
    }

    pub fn add_atom(&mut self, atom: Atom) -> &mut Self {
        self.push_atom(atom);
        self
    }

    pub fn push_atom(&mut self, atom: Atom) -> AtomId {
        let id = self.structure.add_atom(atom);
        self.atoms.push(id);
        id
    }

    pub fn add_bond(
        &mut self,
        begin: usize,
        end: usize,
        bond_type: BondType,
    ) -> Result<&mut Self, BuildError> {
        let bond = Bond::new(self.resolve_atom(begin)?, self.resolve_atom(end)?, bond_type);
        self.push_bond(bond, begin, end)?;
        Ok(self)
    }

    /// Adds a fully populated bond; `begin` and `end` are reported on error.
    pub fn push_bond(&mut self, bond: Bond, begin: usize, end: usize) -> Result<BondId, BuildError> {
        let id = self
            .structure
            .add_bond(bond)
            .ok_or(BuildError::InvalidBond { begin, end })?;
        self.bonds.push(id);
        Ok(id)
    }

    /// Resolves a 1-based atom index.
    pub fn resolve_atom(&self, index: usize) -> Result<AtomId, BuildError> {
        index
            .checked_sub(1)
            .and_then(|i| self.atoms.get(i))
            .copied()
            .ok_or(BuildError::AtomIndexOutOfRange(index))
    }

    /// Resolves a 1-based bond index.
    pub fn resolve_bond(&self, index: usize) -> Option<BondId> {
        index.checked_sub(1).and_then(|i| self.bonds.get(i)).copied()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn structure_mut(&mut self) -> &mut Structure {
        &mut self.structure
    }

    pub fn build(self) -> Structure {
        self.structure
    }
}
