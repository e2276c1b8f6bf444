//! The MDL CTfile codec: V2000 and V3000 molfiles, `$MDL` R-group files and
//! `$RXN` reaction files.
//!
//! [`serialize`] prepares a private copy of the structure (S-group
//! validation and pruning) and dispatches on the dialect and on whether the
//! structure is a reaction or carries R-groups. [`parse`] detects the
//! document kind from its first line and rebuilds the structure, marking
//! fragments at the end.

mod prepare;
pub(crate) mod primitives;
mod reader;
pub(crate) mod v3000;
mod writer;

pub use reader::parse;
pub use writer::serialize;

use super::error::MolfileError;
use super::options::SaveOptions;
use super::traits::StructureFile;
use crate::core::models::structure::Structure;
use std::io::{BufRead, Write};

/// [`StructureFile`] implementation for CTfile documents.
pub struct MolfileFormat;

impl StructureFile for MolfileFormat {
    type Options = SaveOptions;
    type Error = MolfileError;

    fn read_from(reader: &mut impl BufRead) -> Result<Structure, Self::Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        parse(&text)
    }

    fn write_to(
        structure: &Structure,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let text = serialize(structure, options)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::options::Dialect;
    use crate::core::models::atom::{Atom, AtomList, AttachmentPoint, RGROUP_LABEL, Radical};
    use crate::core::models::ids::AtomId;
    use crate::core::models::reaction::RxnArrow;
    use crate::core::models::sgroup::{BracketBox, Connectivity, DataField, SGroup, SGroupKind};
    use crate::core::models::topology::{Bond, BondStereo, BondTopology, BondType};
    use nalgebra::{Point2, Point3};

    const DIALECTS: [Dialect; 2] = [Dialect::V2000, Dialect::V3000];

    fn options(dialect: Dialect) -> SaveOptions {
        SaveOptions::builder().dialect(dialect).build().unwrap()
    }

    fn round_trip(structure: &Structure, dialect: Dialect) -> Structure {
        let text = serialize(structure, &options(dialect)).unwrap();
        parse(&text).unwrap_or_else(|e| panic!("{dialect} output failed to parse: {e}\n{text}"))
    }

    fn chain(structure: &mut Structure, labels: &[&str], x0: f64) -> Vec<AtomId> {
        let ids: Vec<AtomId> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                structure.add_atom(Atom::new(label, Point3::new(x0 + i as f64, 0.5 * i as f64, 0.0)))
            })
            .collect();
        for pair in ids.windows(2) {
            structure
                .add_bond(Bond::new(pair[0], pair[1], BondType::Single))
                .unwrap();
        }
        ids
    }

    fn decorated_molecule() -> Structure {
        let mut structure = Structure::new();
        structure.name = "decorated".to_string();
        structure.is_chiral = true;
        let ids = chain(&mut structure, &["C", "N", "C", "O", "S"], 0.0);

        let atom = structure.atom_mut(ids[0]).unwrap();
        atom.charge = -2;
        atom.isotope = 13;
        atom.aam = 7;
        let atom = structure.atom_mut(ids[1]).unwrap();
        atom.radical = Radical::Triplet;
        atom.explicit_valence = Some(0);
        atom.hydrogen_count = 2;
        let atom = structure.atom_mut(ids[3]).unwrap();
        atom.explicit_valence = Some(4);
        atom.ring_bond_count = 2;
        atom.substitution_count = 3;
        atom.unsaturated = 1;
        atom.inversion = 1;
        atom.exact_change = 1;

        let first_bond = structure.bond_ids()[0];
        let bond = structure.bond_mut(first_bond).unwrap();
        bond.stereo = BondStereo::Up;
        bond.topology = BondTopology::Chain;
        bond.reacting_center = 4;

        let mut field = DataField {
            field_name: "comment".to_string(),
            field_value: "made in a flask".to_string(),
            units: "text".to_string(),
            position: Some(Point2::new(1.5, -2.25)),
            ..DataField::default()
        };
        field.display.attached = true;
        field.display.chars_to_display = Some(40);
        structure.add_sgroup(SGroup::new(SGroupKind::Data(field), vec![ids[0]]));

        let mut repeat = SGroup::new(
            SGroupKind::RepeatUnit {
                subscript: "k".to_string(),
                connectivity: Connectivity::HeadToHead,
            },
            vec![ids[1], ids[2]],
        );
        repeat.bracket_box = Some(BracketBox::new(Point2::new(0.5, -1.0), Point2::new(2.5, 1.5)));
        structure.add_sgroup(repeat);
        structure
    }

    fn atoms(structure: &Structure) -> Vec<&Atom> {
        structure.atoms_iter().map(|(_, atom)| atom).collect()
    }

    #[test]
    fn molecule_fields_survive_both_dialects() {
        let original = decorated_molecule();
        for dialect in DIALECTS {
            let parsed = round_trip(&original, dialect);
            assert_eq!(parsed.name, "decorated");
            assert!(parsed.is_chiral);
            assert_eq!(parsed.atom_count(), original.atom_count());
            assert_eq!(parsed.bond_count(), original.bond_count());

            for (before, after) in atoms(&original).into_iter().zip(atoms(&parsed)) {
                assert_eq!(before.label, after.label);
                assert_eq!(before.position, after.position);
                assert_eq!(before.charge, after.charge);
                assert_eq!(before.isotope, after.isotope);
                assert_eq!(before.radical, after.radical);
                assert_eq!(before.explicit_valence, after.explicit_valence, "{dialect}");
                assert_eq!(before.hydrogen_count, after.hydrogen_count);
                assert_eq!(before.aam, after.aam);
                assert_eq!(before.ring_bond_count, after.ring_bond_count);
                assert_eq!(before.substitution_count, after.substitution_count);
                assert_eq!(before.unsaturated, after.unsaturated);
                assert_eq!(before.inversion, after.inversion);
                assert_eq!(before.exact_change, after.exact_change);
            }

            let bond = parsed.bonds_iter().next().unwrap().1;
            assert_eq!(bond.stereo, BondStereo::Up);
            assert_eq!(bond.topology, BondTopology::Chain);
            assert_eq!(bond.reacting_center, 4);
        }
    }

    #[test]
    fn sgroups_survive_both_dialects() {
        let original = decorated_molecule();
        for dialect in DIALECTS {
            let parsed = round_trip(&original, dialect);
            let groups: Vec<&SGroup> = parsed
                .sgroups_bfs()
                .into_iter()
                .filter_map(|id| parsed.sgroup(id))
                .collect();
            assert_eq!(groups.len(), 2);

            let field = groups[0].data().unwrap();
            assert_eq!(field.field_name, "comment");
            assert_eq!(field.field_value, "made in a flask");
            assert_eq!(field.units, "text");
            assert_eq!(field.position, Some(Point2::new(1.5, -2.25)));
            assert!(field.display.attached);
            assert_eq!(field.display.chars_to_display, Some(40));

            assert_eq!(
                groups[1].kind,
                SGroupKind::RepeatUnit {
                    subscript: "k".to_string(),
                    connectivity: Connectivity::HeadToHead,
                }
            );
            assert_eq!(groups[1].atoms.len(), 2);
            assert_eq!(groups[1].crossing_bonds.len(), 2);
            assert_eq!(
                groups[1].bracket_box,
                Some(BracketBox::new(Point2::new(0.5, -1.0), Point2::new(2.5, 1.5)))
            );
        }
    }

    #[test]
    fn special_labels_survive_both_dialects() {
        let mut original = Structure::new();
        let list = original.add_atom({
            let mut atom = Atom::new("L", Point3::origin());
            atom.atom_list = Some(AtomList::new(["N", "O", "S"], true));
            atom
        });
        let pseudo = original.add_atom({
            let mut atom = Atom::new("Boc", Point3::new(1.0, 0.0, 0.0));
            atom.pseudo = Some("Boc".to_string());
            atom
        });
        let long_pseudo = original.add_atom({
            let mut atom = Atom::new("Fmoc group", Point3::new(2.0, 0.0, 0.0));
            atom.pseudo = Some("Fmoc group".to_string());
            atom
        });
        original.add_bond(Bond::new(list, pseudo, BondType::Any)).unwrap();
        original.add_bond(Bond::new(pseudo, long_pseudo, BondType::Single)).unwrap();

        for dialect in DIALECTS {
            let parsed = round_trip(&original, dialect);
            let atoms = atoms(&parsed);
            let parsed_list = atoms[0].atom_list.as_ref().unwrap();
            assert_eq!(parsed_list.labels, vec!["N", "O", "S"]);
            assert!(parsed_list.negated);
            assert_eq!(atoms[1].pseudo.as_deref(), Some("Boc"));
            assert_eq!(atoms[2].pseudo.as_deref(), Some("Fmoc group"));
            assert_eq!(atoms[2].label, "Fmoc group");
        }
    }

    #[test]
    fn unrecognized_labels_come_back_as_pseudo_atoms() {
        let mut original = Structure::new();
        original.add_atom(Atom::new("Xyz", Point3::origin()));

        for dialect in DIALECTS {
            let parsed = round_trip(&original, dialect);
            let atoms = atoms(&parsed);
            assert_eq!(atoms[0].label, "Xyz");
            assert_eq!(atoms[0].pseudo.as_deref(), Some("Xyz"));
            assert!(atoms[0].alias.is_none());
        }

        let text = serialize(&original, &SaveOptions::default()).unwrap();
        assert!(text.contains("\nA    1\n'Xyz'\n"));
    }

    fn rgroup_structure() -> Structure {
        let mut structure = Structure::new();
        structure.name = "rgroup core".to_string();
        let core = chain(&mut structure, &["C", "C", "C"], 0.0);
        let mut site = Atom::new(RGROUP_LABEL, Point3::new(3.0, 0.0, 0.0));
        site.add_rgroup(1);
        let site = structure.add_atom(site);
        structure.add_bond(Bond::new(core[2], site, BondType::Single)).unwrap();

        let methyl = chain(&mut structure, &["C"], 10.0);
        let ethyl = chain(&mut structure, &["C", "C"], 20.0);
        let mut fragments = Vec::new();
        for (members, point) in [(methyl, AttachmentPoint::Primary), (ethyl, AttachmentPoint::Both)] {
            let fragment = structure.new_fragment();
            for &id in &members {
                structure.atom_mut(id).unwrap().fragment = Some(fragment);
            }
            structure.atom_mut(members[0]).unwrap().attachment_point = Some(point);
            fragments.push(fragment);
        }
        let rgroup = structure.rgroup_entry(1);
        rgroup.fragments = fragments;
        rgroup.if_then = 2;
        rgroup.rest_h = true;
        rgroup.range = "1-3".to_string();
        structure
    }

    #[test]
    fn rgroups_survive_both_dialects() {
        let original = rgroup_structure();
        for dialect in DIALECTS {
            let text = serialize(&original, &options(dialect)).unwrap();
            let parsed = parse(&text).unwrap();
            assert_eq!(parsed.name, "rgroup core");
            assert_eq!(parsed.rgroup_count(), 1);

            let rgroup = parsed.rgroup(1).unwrap();
            assert_eq!(rgroup.if_then, 2);
            assert!(rgroup.rest_h);
            assert_eq!(rgroup.range, "1-3");
            assert_eq!(rgroup.fragments.len(), 2);

            let sizes: Vec<usize> = rgroup
                .fragments
                .iter()
                .map(|&fragment| parsed.fragment_atoms(fragment).len())
                .collect();
            assert_eq!(sizes, vec![1, 2]);
            let ethyl_head = parsed.fragment_atoms(rgroup.fragments[1])[0];
            assert_eq!(
                parsed.atom(ethyl_head).unwrap().attachment_point,
                Some(AttachmentPoint::Both)
            );

            let scaffold = parsed.scaffold();
            assert_eq!(scaffold.atom_count(), 4);
            let site = scaffold.atoms_iter().find(|(_, a)| a.is_rgroup_site()).unwrap().1;
            assert_eq!(site.rgroup_ids(), vec![1]);
        }
    }

    #[test]
    fn suppressed_rgroups_leave_only_the_scaffold() {
        let original = rgroup_structure();
        for dialect in DIALECTS {
            let options = SaveOptions::builder()
                .dialect(dialect)
                .suppress_rgroups(true)
                .build()
                .unwrap();
            let parsed = parse(&serialize(&original, &options).unwrap()).unwrap();
            assert_eq!(parsed.atom_count(), 4);
            assert_eq!(parsed.rgroup_count(), 0);
        }
    }

    #[test]
    fn enhanced_stereo_survives_v3000() {
        let mut original = Structure::new();
        let ids = chain(&mut original, &["C", "C", "C", "C", "C"], 0.0);
        let stereo = original.enhanced_stereo_mut();
        stereo.absolute = vec![ids[0]];
        stereo.relative.insert(1, vec![ids[1], ids[2]]);
        stereo.racemic.insert(2, vec![ids[4]]);

        let parsed = round_trip(&original, Dialect::V3000);
        let numbers = parsed.atom_numbering();
        let number = |atoms: &[AtomId]| -> Vec<usize> { atoms.iter().map(|id| numbers[id]).collect() };
        let stereo = parsed.enhanced_stereo();
        assert_eq!(number(&stereo.absolute), vec![1]);
        assert_eq!(number(&stereo.relative[&1]), vec![2, 3]);
        assert_eq!(number(&stereo.racemic[&2]), vec![5]);

        let dropped = round_trip(&original, Dialect::V2000);
        assert!(dropped.enhanced_stereo().is_empty());
    }

    #[test]
    fn reactions_keep_their_piles_in_both_dialects() {
        let mut original = Structure::new();
        original.name = "amide coupling".to_string();
        chain(&mut original, &["C", "O"], 0.0);
        chain(&mut original, &["N"], 4.0);
        chain(&mut original, &["C", "N"], 12.0);
        original.add_arrow(RxnArrow::new(Point2::new(8.0, 0.0)));

        for dialect in DIALECTS {
            let parsed = round_trip(&original, dialect);
            assert_eq!(parsed.name, "amide coupling");
            assert_eq!(parsed.arrows().len(), 1);
            let components = parsed.reaction_components();
            let labels = |pile: &[Vec<AtomId>]| -> Vec<Vec<String>> {
                pile.iter()
                    .map(|c| c.iter().map(|&id| parsed.atom(id).unwrap().label.clone()).collect())
                    .collect()
            };
            assert_eq!(labels(&components.reactants), vec![vec!["C", "O"], vec!["N"]]);
            assert_eq!(labels(&components.products), vec![vec!["C", "N"]]);
        }
    }

    #[test]
    fn indices_are_dense_after_removals() {
        let mut original = Structure::new();
        let ids = chain(&mut original, &["C", "Cl", "C", "Br"], 0.0);
        original.remove_atom(ids[1]);
        original.add_bond(Bond::new(ids[0], ids[2], BondType::Double)).unwrap();

        for dialect in DIALECTS {
            let parsed = round_trip(&original, dialect);
            let labels: Vec<&str> = atoms(&parsed).iter().map(|a| a.label.as_str()).collect();
            assert_eq!(labels, vec!["C", "C", "Br"]);
            let numbers = parsed.atom_numbering();
            let bonds: Vec<(usize, usize, BondType)> = parsed
                .bonds_iter()
                .map(|(_, b)| (numbers[&b.begin], numbers[&b.end], b.bond_type))
                .collect();
            assert_eq!(bonds, vec![(2, 3, BondType::Single), (1, 2, BondType::Double)]);
        }
    }

    #[test]
    fn structure_file_round_trips_through_a_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decorated.mol");
        let original = decorated_molecule();
        MolfileFormat::write_to_path(&original, &SaveOptions::v3000(), &path).unwrap();
        let parsed = MolfileFormat::read_from_path(&path).unwrap();
        assert_eq!(parsed.atom_count(), original.atom_count());
        assert_eq!(parsed.sgroup_count(), 2);
    }

    #[test]
    fn failed_writes_produce_no_output() {
        let mut structure = decorated_molecule();
        structure.add_arrow(RxnArrow::new(Point2::origin()));
        structure.add_arrow(RxnArrow::new(Point2::new(1.0, 0.0)));
        let mut out = Vec::new();
        let result = MolfileFormat::write_to(&structure, &SaveOptions::default(), &mut out);
        assert!(matches!(result, Err(MolfileError::Unsupported(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn parse_reports_malformed_numbers_with_line() {
        let text = "name\n\n\n  1  0  0  0  0  0            999 V2000\n    abcdef    0.0000    0.0000 C   0  0\nM  END\n";
        let error = parse(text).unwrap_err();
        assert!(error.to_string().contains("line 5"), "{error}");
    }
}
