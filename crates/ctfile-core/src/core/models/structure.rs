use super::atom::Atom;
use super::ids::{AtomId, BondId, FragmentId, SGroupId};
use super::reaction::{ReactionComponents, RxnArrow, RxnPlus};
use super::rgroup::RGroup;
use super::sgroup::SGroup;
use super::stereo::EnhancedStereo;
use super::topology::Bond;
use nalgebra::{Point2, Vector3};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// A chemical structure: atoms, bonds, S-groups, R-groups, reaction
/// graphics and enhanced stereo annotations.
///
/// Entities are stored in slot maps, so ids stay stable across removals.
/// Authoring order is tracked separately and drives every iterator as well
/// as the 1-based numbering exchanged with files.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    /// Structure name, the first header line of a molfile.
    pub name: String,
    /// Chiral flag of the counts line.
    pub is_chiral: bool,
    atoms: SlotMap<AtomId, Atom>,
    atom_order: Vec<AtomId>,
    bonds: SlotMap<BondId, Bond>,
    bond_order: Vec<BondId>,
    /// Incident bonds of every atom.
    neighbors: SecondaryMap<AtomId, Vec<BondId>>,
    sgroups: SlotMap<SGroupId, SGroup>,
    sgroup_order: Vec<SGroupId>,
    fragments: SlotMap<FragmentId, ()>,
    rgroups: BTreeMap<u32, RGroup>,
    arrows: Vec<RxnArrow>,
    pluses: Vec<RxnPlus>,
    enhanced_stereo: EnhancedStereo,
}

impl Structure {
    /// Creates a new, empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&Atom)` if the atom exists, otherwise `None`.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&mut Atom)` if the atom exists, otherwise `None`.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms in authoring order.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &Atom)` pairs.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atom_order
            .iter()
            .filter_map(|&id| self.atoms.get(id).map(|atom| (id, atom)))
    }

    /// Atom ids in authoring order.
    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_order
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Maps every atom to its 1-based position in authoring order.
    pub fn atom_numbering(&self) -> HashMap<AtomId, usize> {
        self.atom_order
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index + 1))
            .collect()
    }

    /// Adds an atom to the end of the authoring order.
    ///
    /// # Arguments
    ///
    /// * `atom` - The atom to add.
    ///
    /// # Return
    ///
    /// The ID assigned to the new atom.
    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let atom_id = self.atoms.insert(atom);
        self.atom_order.push(atom_id);
        self.neighbors.insert(atom_id, Vec::new());
        atom_id
    }

    /// Removes an atom together with its bonds, S-group memberships and
    /// stereo annotations.
    ///
    /// # Arguments
    ///
    /// * `atom_id` - The ID of the atom to remove.
    ///
    /// # Return
    ///
    /// Returns `Some(Atom)` if the atom existed and was removed, otherwise `None`.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;
        self.atom_order.retain(|&id| id != atom_id);

        let incident = self.neighbors.remove(atom_id).unwrap_or_default();
        for bond_id in incident {
            self.remove_bond(bond_id);
        }

        for sgroup in self.sgroups.values_mut() {
            sgroup.atoms.retain(|&id| id != atom_id);
            if let Some(patoms) = sgroup.patoms.as_mut() {
                patoms.retain(|&id| id != atom_id);
            }
        }
        self.enhanced_stereo.remove_atom(atom_id);

        Some(atom)
    }

    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.get(id)
    }

    pub fn bond_mut(&mut self, id: BondId) -> Option<&mut Bond> {
        self.bonds.get_mut(id)
    }

    /// Returns an iterator over all bonds in authoring order.
    pub fn bonds_iter(&self) -> impl Iterator<Item = (BondId, &Bond)> {
        self.bond_order
            .iter()
            .filter_map(|&id| self.bonds.get(id).map(|bond| (id, bond)))
    }

    pub fn bond_ids(&self) -> &[BondId] {
        &self.bond_order
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Maps every bond to its 1-based position in authoring order.
    pub fn bond_numbering(&self) -> HashMap<BondId, usize> {
        self.bond_order
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index + 1))
            .collect()
    }

    /// Adds a bond between two existing, distinct atoms.
    ///
    /// # Arguments
    ///
    /// * `bond` - The bond to add; its endpoints must already be present.
    ///
    /// # Return
    ///
    /// Returns `Some(BondId)` if successful, otherwise `None` (missing
    /// endpoint or a bond from an atom to itself).
    pub fn add_bond(&mut self, bond: Bond) -> Option<BondId> {
        if bond.begin == bond.end
            || !self.atoms.contains_key(bond.begin)
            || !self.atoms.contains_key(bond.end)
        {
            return None;
        }
        let (begin, end) = (bond.begin, bond.end);
        let bond_id = self.bonds.insert(bond);
        self.bond_order.push(bond_id);
        self.neighbors.entry(begin)?.or_default().push(bond_id);
        self.neighbors.entry(end)?.or_default().push(bond_id);
        Some(bond_id)
    }

    /// Removes a bond and drops it from every S-group crossing-bond list.
    pub fn remove_bond(&mut self, bond_id: BondId) -> Option<Bond> {
        let bond = self.bonds.remove(bond_id)?;
        self.bond_order.retain(|&id| id != bond_id);
        for atom_id in [bond.begin, bond.end] {
            if let Some(incident) = self.neighbors.get_mut(atom_id) {
                incident.retain(|&id| id != bond_id);
            }
        }
        for sgroup in self.sgroups.values_mut() {
            sgroup.crossing_bonds.retain(|&id| id != bond_id);
        }
        Some(bond)
    }

    /// Finds the bond joining two atoms, in either direction.
    pub fn find_bond(&self, a: AtomId, b: AtomId) -> Option<BondId> {
        self.neighbors(a)
            .iter()
            .copied()
            .find(|&bond_id| self.bonds.get(bond_id).is_some_and(|bond| bond.other(a) == Some(b)))
    }

    /// Bonds incident to `atom_id`; empty for unknown atoms.
    pub fn neighbors(&self, atom_id: AtomId) -> &[BondId] {
        self.neighbors
            .get(atom_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Atoms directly bonded to `atom_id`.
    pub fn neighbor_atoms(&self, atom_id: AtomId) -> Vec<AtomId> {
        self.neighbors(atom_id)
            .iter()
            .filter_map(|&bond_id| self.bonds.get(bond_id)?.other(atom_id))
            .collect()
    }

    /// Bonds with exactly one endpoint inside `atom_ids`, in authoring order.
    pub fn crossing_bonds(&self, atom_ids: &[AtomId]) -> Vec<BondId> {
        let inside: HashSet<AtomId> = atom_ids.iter().copied().collect();
        self.bonds_iter()
            .filter(|(_, bond)| inside.contains(&bond.begin) != inside.contains(&bond.end))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn sgroup(&self, id: SGroupId) -> Option<&SGroup> {
        self.sgroups.get(id)
    }

    pub fn sgroup_mut(&mut self, id: SGroupId) -> Option<&mut SGroup> {
        self.sgroups.get_mut(id)
    }

    /// Returns an iterator over all S-groups in authoring order.
    pub fn sgroups_iter(&self) -> impl Iterator<Item = (SGroupId, &SGroup)> {
        self.sgroup_order
            .iter()
            .filter_map(|&id| self.sgroups.get(id).map(|sgroup| (id, sgroup)))
    }

    pub fn sgroup_count(&self) -> usize {
        self.sgroups.len()
    }

    /// Adds an S-group. A parent reference to a missing group is cleared.
    pub fn add_sgroup(&mut self, mut sgroup: SGroup) -> SGroupId {
        if sgroup
            .parent
            .is_some_and(|parent| !self.sgroups.contains_key(parent))
        {
            sgroup.parent = None;
        }
        let sgroup_id = self.sgroups.insert(sgroup);
        self.sgroup_order.push(sgroup_id);
        sgroup_id
    }

    /// Re-parents an S-group.
    ///
    /// # Arguments
    ///
    /// * `child` - The group whose parent changes.
    /// * `parent` - The new parent, or `None` to make `child` a root.
    ///
    /// # Return
    ///
    /// Returns `false` (leaving the forest untouched) if either group is
    /// missing or the change would create a cycle.
    pub fn set_sgroup_parent(&mut self, child: SGroupId, parent: Option<SGroupId>) -> bool {
        if !self.sgroups.contains_key(child) {
            return false;
        }
        if let Some(parent) = parent {
            let mut cursor = Some(parent);
            while let Some(current) = cursor {
                if current == child {
                    return false;
                }
                match self.sgroups.get(current) {
                    Some(sgroup) => cursor = sgroup.parent,
                    None => return false,
                }
            }
        }
        if let Some(sgroup) = self.sgroups.get_mut(child) {
            sgroup.parent = parent;
        }
        true
    }

    /// Removes an S-group; its children are re-attached to its parent.
    pub fn remove_sgroup(&mut self, sgroup_id: SGroupId) -> Option<SGroup> {
        let removed = self.sgroups.remove(sgroup_id)?;
        self.sgroup_order.retain(|&id| id != sgroup_id);
        for sgroup in self.sgroups.values_mut() {
            if sgroup.parent == Some(sgroup_id) {
                sgroup.parent = removed.parent;
            }
        }
        Some(removed)
    }

    /// Direct children of an S-group, in authoring order.
    pub fn sgroup_children(&self, sgroup_id: SGroupId) -> Vec<SGroupId> {
        self.sgroups_iter()
            .filter(|(_, sgroup)| sgroup.parent == Some(sgroup_id))
            .map(|(id, _)| id)
            .collect()
    }

    /// Breadth-first order of the S-group forest: all roots first, then each
    /// level left to right in authoring order.
    ///
    /// Groups unreachable from a root (a parent cycle introduced through
    /// [`Structure::sgroup_mut`]) are appended at the end.
    pub fn sgroups_bfs(&self) -> Vec<SGroupId> {
        let mut order = Vec::with_capacity(self.sgroup_order.len());
        let mut visited = HashSet::new();
        let mut queue: VecDeque<SGroupId> = self
            .sgroups_iter()
            .filter(|(_, sgroup)| {
                sgroup
                    .parent
                    .is_none_or(|parent| !self.sgroups.contains_key(parent))
            })
            .map(|(id, _)| id)
            .collect();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            queue.extend(self.sgroup_children(current));
        }

        for &id in &self.sgroup_order {
            if visited.insert(id) {
                order.push(id);
            }
        }
        order
    }

    /// Allocates a new, empty fragment id.
    pub fn new_fragment(&mut self) -> FragmentId {
        self.fragments.insert(())
    }

    pub fn fragment_ids(&self) -> impl Iterator<Item = FragmentId> + '_ {
        self.fragments.keys()
    }

    /// Atoms of a fragment, in authoring order.
    pub fn fragment_atoms(&self, fragment: FragmentId) -> Vec<AtomId> {
        self.atoms_iter()
            .filter(|(_, atom)| atom.fragment == Some(fragment))
            .map(|(id, _)| id)
            .collect()
    }

    /// Connected components of the bond graph, each listed in authoring
    /// order; components are ordered by their first atom.
    pub fn connected_components(&self) -> Vec<Vec<AtomId>> {
        let position: HashMap<AtomId, usize> = self
            .atom_order
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        let mut visited = HashSet::new();
        let mut components = Vec::new();

        for &start in &self.atom_order {
            if !visited.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                for next in self.neighbor_atoms(current) {
                    if visited.insert(next) {
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            component.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));
            components.push(component);
        }
        components
    }

    /// Assigns every connected component to a fragment.
    ///
    /// A component that already has atoms in a live fragment keeps that
    /// fragment, so R-group fragment assignments survive; every other
    /// component gets a fresh fragment id.
    pub fn mark_fragments(&mut self) {
        for component in self.connected_components() {
            let existing = component
                .iter()
                .filter_map(|&id| self.atoms.get(id).and_then(|atom| atom.fragment))
                .find(|&fragment| self.fragments.contains_key(fragment));
            let fragment = match existing {
                Some(fragment) => fragment,
                None => self.fragments.insert(()),
            };
            for atom_id in component {
                if let Some(atom) = self.atoms.get_mut(atom_id) {
                    atom.fragment = Some(fragment);
                }
            }
        }
    }

    pub fn rgroup(&self, number: u32) -> Option<&RGroup> {
        self.rgroups.get(&number)
    }

    pub fn rgroup_mut(&mut self, number: u32) -> Option<&mut RGroup> {
        self.rgroups.get_mut(&number)
    }

    /// Returns the R-group with the given number, creating an empty one first
    /// if needed.
    pub fn rgroup_entry(&mut self, number: u32) -> &mut RGroup {
        self.rgroups.entry(number).or_default()
    }

    pub fn insert_rgroup(&mut self, number: u32, rgroup: RGroup) -> Option<RGroup> {
        self.rgroups.insert(number, rgroup)
    }

    /// R-groups in ascending number order.
    pub fn rgroups_iter(&self) -> impl Iterator<Item = (u32, &RGroup)> {
        self.rgroups.iter().map(|(&number, rgroup)| (number, rgroup))
    }

    pub fn rgroup_count(&self) -> usize {
        self.rgroups.len()
    }

    /// The structure without its R-group fragment alternatives.
    ///
    /// R-group attachment atoms (`R#`) belong to the scaffold and are kept.
    pub fn scaffold(&self) -> Structure {
        let rgroup_fragments: HashSet<FragmentId> = self
            .rgroups
            .values()
            .flat_map(|rgroup| rgroup.fragments.iter().copied())
            .collect();
        let atoms: Vec<AtomId> = self
            .atoms_iter()
            .filter(|(_, atom)| {
                atom.fragment
                    .is_none_or(|fragment| !rgroup_fragments.contains(&fragment))
            })
            .map(|(id, _)| id)
            .collect();
        self.extract(&atoms)
    }

    /// A standalone copy of one fragment.
    pub fn fragment(&self, fragment: FragmentId) -> Structure {
        self.extract(&self.fragment_atoms(fragment))
    }

    /// Copies a subset of atoms into a new structure.
    ///
    /// Bonds come along when both endpoints are selected, S-groups when all
    /// of their member atoms are. Atom, bond and S-group authoring order is
    /// preserved; R-groups and reaction graphics are not carried.
    pub fn extract(&self, atom_ids: &[AtomId]) -> Structure {
        let selected: HashSet<AtomId> = atom_ids.iter().copied().collect();
        let mut sub = Structure::new();
        sub.name = self.name.clone();
        sub.is_chiral = self.is_chiral;
        sub.absorb(self, Some(&selected));
        sub
    }

    /// Appends a copy of `other`'s atoms, bonds, S-groups and enhanced stereo.
    ///
    /// Fragments of `other` are given fresh ids in `self`.
    ///
    /// # Return
    ///
    /// The mapping from `other`'s atom ids to the new ids in `self`.
    pub fn merge(&mut self, other: &Structure) -> HashMap<AtomId, AtomId> {
        self.absorb(other, None)
    }

    fn absorb(
        &mut self,
        source: &Structure,
        selected: Option<&HashSet<AtomId>>,
    ) -> HashMap<AtomId, AtomId> {
        let is_selected = |id: &AtomId| selected.is_none_or(|set| set.contains(id));

        let mut atom_map = HashMap::new();
        let mut fragment_map: HashMap<FragmentId, FragmentId> = HashMap::new();
        for (old_id, atom) in source.atoms_iter() {
            if !is_selected(&old_id) {
                continue;
            }
            let mut atom = atom.clone();
            atom.fragment = atom
                .fragment
                .map(|old| *fragment_map.entry(old).or_insert_with(|| self.fragments.insert(())));
            atom_map.insert(old_id, self.add_atom(atom));
        }

        let mut bond_map = HashMap::new();
        for (old_id, bond) in source.bonds_iter() {
            let (Some(&begin), Some(&end)) = (atom_map.get(&bond.begin), atom_map.get(&bond.end))
            else {
                continue;
            };
            let mut bond = bond.clone();
            bond.begin = begin;
            bond.end = end;
            if let Some(new_id) = self.add_bond(bond) {
                bond_map.insert(old_id, new_id);
            }
        }

        let mut sgroup_map = HashMap::new();
        let mut copied = Vec::new();
        for (old_id, sgroup) in source.sgroups_iter() {
            if !sgroup.atoms.iter().all(|id| atom_map.contains_key(id)) {
                continue;
            }
            let mut sgroup = sgroup.clone();
            sgroup.atoms = sgroup.atoms.iter().map(|id| atom_map[id]).collect();
            sgroup.crossing_bonds = sgroup
                .crossing_bonds
                .iter()
                .filter_map(|id| bond_map.get(id).copied())
                .collect();
            sgroup.patoms = sgroup
                .patoms
                .map(|patoms| patoms.iter().filter_map(|id| atom_map.get(id).copied()).collect());
            let old_parent = sgroup.parent.take();
            let new_id = self.add_sgroup(sgroup);
            sgroup_map.insert(old_id, new_id);
            copied.push((new_id, old_parent));
        }
        for (new_id, old_parent) in copied {
            let parent = old_parent.and_then(|old| sgroup_map.get(&old).copied());
            if let Some(sgroup) = self.sgroups.get_mut(new_id) {
                sgroup.parent = parent;
            }
        }

        self.enhanced_stereo
            .extend(source.enhanced_stereo.remapped(&atom_map));
        atom_map
    }

    pub fn arrows(&self) -> &[RxnArrow] {
        &self.arrows
    }

    pub fn add_arrow(&mut self, arrow: RxnArrow) {
        self.arrows.push(arrow);
    }

    pub fn pluses(&self) -> &[RxnPlus] {
        &self.pluses
    }

    pub fn add_plus(&mut self, plus: RxnPlus) {
        self.pluses.push(plus);
    }

    /// A structure with any reaction arrow is treated as a reaction.
    pub fn is_reaction(&self) -> bool {
        !self.arrows.is_empty()
    }

    pub fn enhanced_stereo(&self) -> &EnhancedStereo {
        &self.enhanced_stereo
    }

    pub fn enhanced_stereo_mut(&mut self) -> &mut EnhancedStereo {
        &mut self.enhanced_stereo
    }

    /// The 2D bounding box of the given atoms, as `(min, max)` corners.
    ///
    /// Returns `None` when none of the ids refer to an existing atom.
    pub fn bounding_box(&self, atom_ids: &[AtomId]) -> Option<(Point2<f64>, Point2<f64>)> {
        let mut points = atom_ids
            .iter()
            .filter_map(|&id| self.atoms.get(id))
            .map(|atom| Point2::new(atom.position.x, atom.position.y));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (
                Point2::new(min.x.min(p.x), min.y.min(p.y)),
                Point2::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }

    /// Moves the given atoms by `offset`.
    pub fn translate_atoms(&mut self, atom_ids: &[AtomId], offset: Vector3<f64>) {
        for &id in atom_ids {
            if let Some(atom) = self.atoms.get_mut(id) {
                atom.position += offset;
            }
        }
    }

    /// Splits the structure into reactant and product piles.
    ///
    /// Each connected component is a reactant when its bounding-box center
    /// lies left of the first arrow and a product otherwise. Without an arrow
    /// every component is a reactant. Piles are sorted left to right.
    pub fn reaction_components(&self) -> ReactionComponents {
        let arrow_x = self.arrows.first().map(|arrow| arrow.position.x);
        let mut reactants = Vec::new();
        let mut products = Vec::new();

        for component in self.connected_components() {
            let center_x = self
                .bounding_box(&component)
                .map(|(min, max)| (min.x + max.x) / 2.0)
                .unwrap_or(0.0);
            match arrow_x {
                Some(x) if center_x > x => products.push((center_x, component)),
                _ => reactants.push((center_x, component)),
            }
        }

        let into_sorted = |mut pile: Vec<(f64, Vec<AtomId>)>| -> Vec<Vec<AtomId>> {
            pile.sort_by(|a, b| a.0.total_cmp(&b.0));
            pile.into_iter().map(|(_, atoms)| atoms).collect()
        };
        ReactionComponents {
            reactants: into_sorted(reactants),
            products: into_sorted(products),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::sgroup::SGroupKind;
    use crate::core::models::topology::BondType;
    use nalgebra::Point3;

    fn chain(structure: &mut Structure, labels: &[&str], x0: f64) -> Vec<AtomId> {
        let ids: Vec<AtomId> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| structure.add_atom(Atom::new(label, Point3::new(x0 + i as f64, 0.0, 0.0))))
            .collect();
        for pair in ids.windows(2) {
            structure
                .add_bond(Bond::new(pair[0], pair[1], BondType::Single))
                .unwrap();
        }
        ids
    }

    #[test]
    fn iteration_follows_authoring_order_after_removal() {
        let mut structure = Structure::new();
        let ids = chain(&mut structure, &["C", "N", "O", "S"], 0.0);
        structure.remove_atom(ids[1]);
        let re_added = structure.add_atom(Atom::new("P", Point3::origin()));

        let labels: Vec<&str> = structure
            .atoms_iter()
            .map(|(_, atom)| atom.label.as_str())
            .collect();
        assert_eq!(labels, vec!["C", "O", "S", "P"]);
        assert_eq!(structure.atom_numbering()[&re_added], 4);
        assert_eq!(structure.bond_count(), 1);
        assert!(structure.find_bond(ids[2], ids[3]).is_some());
        assert!(structure.find_bond(ids[0], ids[1]).is_none());
    }

    #[test]
    fn add_bond_rejects_missing_endpoints_and_self_loops() {
        let mut structure = Structure::new();
        let a = structure.add_atom(Atom::new("C", Point3::origin()));
        let b = structure.add_atom(Atom::new("C", Point3::origin()));
        structure.remove_atom(b);
        assert!(structure.add_bond(Bond::new(a, b, BondType::Single)).is_none());
        assert!(structure.add_bond(Bond::new(a, a, BondType::Single)).is_none());
    }

    #[test]
    fn sgroups_bfs_orders_roots_before_children() {
        let mut structure = Structure::new();
        let atoms = chain(&mut structure, &["C", "C", "C"], 0.0);
        let mut add = |parent: Option<SGroupId>| {
            let mut sgroup = SGroup::new(SGroupKind::Generic, atoms.clone());
            sgroup.parent = parent;
            structure.add_sgroup(sgroup)
        };
        let root_a = add(None);
        let root_b = add(None);
        let child = add(Some(root_a));
        let grandchild = add(Some(child));
        let root_c = add(None);

        let order = structure.sgroups_bfs();
        assert_eq!(
            order,
            vec![root_a, root_b, root_c, child, grandchild]
        );
    }

    #[test]
    fn removing_sgroup_reparents_children() {
        let mut structure = Structure::new();
        let atoms = chain(&mut structure, &["C", "C"], 0.0);
        let root = structure.add_sgroup(SGroup::new(SGroupKind::Generic, atoms.clone()));
        let mut middle = SGroup::new(SGroupKind::Generic, atoms.clone());
        middle.parent = Some(root);
        let middle = structure.add_sgroup(middle);
        let mut leaf = SGroup::new(SGroupKind::Generic, atoms);
        leaf.parent = Some(middle);
        let leaf = structure.add_sgroup(leaf);

        structure.remove_sgroup(middle);
        assert_eq!(structure.sgroup(leaf).unwrap().parent, Some(root));
        assert_eq!(structure.sgroup_children(root), vec![leaf]);
    }

    #[test]
    fn set_sgroup_parent_rejects_cycles() {
        let mut structure = Structure::new();
        let a = structure.add_sgroup(SGroup::new(SGroupKind::Generic, vec![]));
        let b = structure.add_sgroup(SGroup::new(SGroupKind::Generic, vec![]));
        assert!(structure.set_sgroup_parent(b, Some(a)));
        assert!(!structure.set_sgroup_parent(a, Some(b)));
        assert!(!structure.set_sgroup_parent(a, Some(a)));
        assert_eq!(structure.sgroup(a).unwrap().parent, None);
    }

    #[test]
    fn mark_fragments_keeps_existing_assignment_per_component() {
        let mut structure = Structure::new();
        let first = chain(&mut structure, &["C", "C"], 0.0);
        let second = chain(&mut structure, &["O", "O"], 5.0);
        let fixed = structure.new_fragment();
        structure.atom_mut(second[0]).unwrap().fragment = Some(fixed);

        structure.mark_fragments();

        assert_eq!(structure.atom(second[1]).unwrap().fragment, Some(fixed));
        let other = structure.atom(first[0]).unwrap().fragment.unwrap();
        assert_ne!(other, fixed);
        assert_eq!(structure.fragment_atoms(other), first);
    }

    #[test]
    fn scaffold_excludes_rgroup_fragments_but_keeps_attachment_sites() {
        let mut structure = Structure::new();
        let core = chain(&mut structure, &["C", "R#"], 0.0);
        let alternative = chain(&mut structure, &["O", "C"], 5.0);
        structure.mark_fragments();
        let fragment = structure.atom(alternative[0]).unwrap().fragment.unwrap();
        structure.rgroup_entry(1).fragments.push(fragment);

        let scaffold = structure.scaffold();
        let labels: Vec<&str> = scaffold
            .atoms_iter()
            .map(|(_, atom)| atom.label.as_str())
            .collect();
        assert_eq!(labels, vec!["C", "R#"]);
        assert_eq!(scaffold.bond_count(), 1);
        assert_eq!(scaffold.rgroup_count(), 0);

        let extracted = structure.fragment(fragment);
        assert_eq!(extracted.atom_count(), 2);
        assert_eq!(extracted.bond_count(), 1);
        assert!(core.iter().all(|&id| structure.atom(id).is_some()));
    }

    #[test]
    fn extract_keeps_sgroups_fully_inside_selection() {
        let mut structure = Structure::new();
        let atoms = chain(&mut structure, &["C", "C", "C"], 0.0);
        let inside = structure.add_sgroup(SGroup::new(SGroupKind::Generic, atoms[..2].to_vec()));
        let mut nested = SGroup::new(SGroupKind::Generic, vec![atoms[0]]);
        nested.parent = Some(inside);
        structure.add_sgroup(nested);
        structure.add_sgroup(SGroup::new(SGroupKind::Generic, atoms.clone()));
        structure.enhanced_stereo_mut().absolute = vec![atoms[0], atoms[2]];

        let sub = structure.extract(&atoms[..2]);
        assert_eq!(sub.sgroup_count(), 2);
        let order = sub.sgroups_bfs();
        assert_eq!(sub.sgroup(order[1]).unwrap().parent, Some(order[0]));
        assert_eq!(sub.enhanced_stereo().absolute.len(), 1);
    }

    #[test]
    fn merge_appends_with_fresh_ids() {
        let mut target = Structure::new();
        chain(&mut target, &["C"], 0.0);
        let mut source = Structure::new();
        let source_atoms = chain(&mut source, &["N", "O"], 0.0);
        source.mark_fragments();

        let map = target.merge(&source);
        assert_eq!(target.atom_count(), 3);
        assert_eq!(target.bond_count(), 1);
        let merged = map[&source_atoms[1]];
        assert_eq!(target.atom(merged).unwrap().label, "O");
        assert!(target.atom(merged).unwrap().fragment.is_some());
    }

    #[test]
    fn reaction_components_split_by_arrow() {
        let mut structure = Structure::new();
        let product = chain(&mut structure, &["C", "O"], 10.0);
        let reactant_b = chain(&mut structure, &["N"], 4.0);
        let reactant_a = chain(&mut structure, &["C", "C"], 0.0);
        structure.add_arrow(RxnArrow::new(Point2::new(7.0, 0.0)));

        let components = structure.reaction_components();
        assert_eq!(components.reactants, vec![reactant_a, reactant_b]);
        assert_eq!(components.products, vec![product]);
        assert_eq!(components.all().count(), 3);
    }

    #[test]
    fn bounding_box_spans_selected_atoms() {
        let mut structure = Structure::new();
        let a = structure.add_atom(Atom::new("C", Point3::new(-1.0, 2.0, 0.0)));
        let b = structure.add_atom(Atom::new("C", Point3::new(3.0, -4.0, 0.0)));
        let (min, max) = structure.bounding_box(&[a, b]).unwrap();
        assert_eq!(min, Point2::new(-1.0, -4.0));
        assert_eq!(max, Point2::new(3.0, 2.0));
        assert!(structure.bounding_box(&[]).is_none());
    }
}
