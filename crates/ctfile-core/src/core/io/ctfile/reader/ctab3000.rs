use super::rgroup::read_rgroup3000;
use super::sgroup::{attach_sgroups, parse_sgroup3000, resolve_list};
use super::{LineCursor, build_error, rgroup_out_of_range};
use crate::core::io::ctfile::primitives::{parse_float_token, parse_index, parse_int_token};
use crate::core::io::ctfile::v3000::{Record, parse_list};
use crate::core::io::error::{MolfileError, ParseErrorKind};
use crate::core::models::atom::{ATOM_LIST_LABEL, Atom, AtomList, AttachmentPoint, Radical};
use crate::core::models::builder::BuildError;
use crate::core::models::ids::{AtomId, BondId};
use crate::core::models::stereo::EnhancedStereo;
use crate::core::models::structure::Structure;
use crate::core::models::topology::{Bond, BondStereo, BondTopology, BondType};
use crate::core::utils::elements::is_known_label;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Next record inside `block`, failing if the document ends first.
fn next_in_block(cursor: &mut LineCursor, block: &str) -> Result<String, MolfileError> {
    if cursor.is_at_end() {
        return Err(cursor.error(ParseErrorKind::UnbalancedBlock(block.to_string())));
    }
    cursor.next_v30()
}

fn parse_record(body: &str, line: usize) -> Result<Record, MolfileError> {
    Record::parse(body).map_err(|kind| MolfileError::parse(line, kind))
}

fn positional<'a>(record: &'a Record, index: usize, what: &str, line: usize) -> Result<&'a str, MolfileError> {
    record.positional(index).ok_or_else(|| {
        MolfileError::parse(line, ParseErrorKind::MissingRecord(what.to_string()))
    })
}

fn keyword_int(record: &Record, key: &str, line: usize) -> Result<Option<i64>, MolfileError> {
    record
        .get(key)
        .map(|value| parse_int_token(value, key, line))
        .transpose()
}

fn unexpected(expected: &str, found: impl ToString, line: usize) -> MolfileError {
    MolfileError::parse(
        line,
        ParseErrorKind::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
        },
    )
}

/// Builds an atom from the type token: list notation, a known label, or
/// free pseudo-atom text.
fn atom_from_type(token: &str, position: Point3<f64>, line: usize) -> Result<Atom, MolfileError> {
    if token.starts_with('[') || token.starts_with("NOT ") {
        let list: AtomList = token.parse().map_err(|_| {
            MolfileError::parse(line, ParseErrorKind::InvalidAtomList(token.to_string()))
        })?;
        let mut atom = Atom::new(ATOM_LIST_LABEL, position);
        atom.atom_list = Some(list);
        return Ok(atom);
    }
    let mut atom = Atom::new(token, position);
    if !is_known_label(token) {
        atom.pseudo = Some(token.to_string());
    }
    Ok(atom)
}

fn parse_atom_record(record: &Record, line: usize) -> Result<(usize, Atom), MolfileError> {
    let index = parse_index(positional(record, 0, "atom index", line)?, "atom", line)?;
    let token = positional(record, 1, "atom type", line)?;
    let mut coords = [0.0; 3];
    for (i, value) in coords.iter_mut().enumerate() {
        *value = parse_float_token(positional(record, 2 + i, "atom coordinate", line)?, "coordinate", line)?;
    }
    let mut atom = atom_from_type(token, Point3::new(coords[0], -coords[1], coords[2]), line)?;
    if let Some(aam) = record.positional(5) {
        atom.aam = parse_int_token(aam, "atom mapping", line)?.max(0) as u32;
    }

    if let Some(charge) = keyword_int(record, "CHG", line)? {
        atom.charge = charge as i32;
    }
    if let Some(code) = keyword_int(record, "RAD", line)? {
        atom.radical = Radical::from_code(code).ok_or_else(|| unexpected("radical 0-3", code, line))?;
    }
    atom.explicit_valence = match keyword_int(record, "VAL", line)? {
        None | Some(0) => None,
        Some(-1) => Some(0),
        Some(v @ 1..=255) => Some(v as u8),
        Some(v) => return Err(unexpected("valence -1 to 255", v, line)),
    };
    if let Some(count) = keyword_int(record, "HCOUNT", line)? {
        atom.hydrogen_count = count as i32;
    }
    if let Some(flag) = keyword_int(record, "INVRET", line)? {
        atom.inversion = flag as i32;
    }
    if let Some(flag) = keyword_int(record, "EXACHG", line)? {
        atom.exact_change = flag as i32;
    }
    if let Some(count) = keyword_int(record, "SUBST", line)? {
        atom.substitution_count = count as i32;
    }
    if let Some(flag) = keyword_int(record, "UNSAT", line)? {
        atom.unsaturated = flag as i32;
    }
    if let Some(count) = keyword_int(record, "RBCNT", line)? {
        atom.ring_bond_count = count as i32;
    }
    if let Some(code) = keyword_int(record, "ATTCHPT", line)? {
        atom.attachment_point = AttachmentPoint::from_v3000_code(code);
    }
    if let Some(list) = record.get("RGROUPS") {
        for number in parse_list(list).map_err(|kind| MolfileError::parse(line, kind))? {
            let number = parse_int_token(&number, "R-group number", line)?;
            if !atom.add_rgroup(number.max(0) as u32) {
                return Err(rgroup_out_of_range(number, line));
            }
        }
    }
    if let Some(mass) = keyword_int(record, "MASS", line)? {
        atom.isotope = mass as i32;
    }
    Ok((index, atom))
}

fn parse_bond_record(
    record: &Record,
    atoms: &HashMap<usize, AtomId>,
    line: usize,
) -> Result<(usize, Bond), MolfileError> {
    let index = parse_index(positional(record, 0, "bond index", line)?, "bond", line)?;
    let type_code = parse_int_token(positional(record, 1, "bond type", line)?, "bond type", line)?;
    let bond_type = BondType::from_code(type_code).ok_or_else(|| unexpected("bond type 1-10", type_code, line))?;
    let mut ends = [0usize; 2];
    for (i, end) in ends.iter_mut().enumerate() {
        *end = parse_index(positional(record, 2 + i, "bond atom", line)?, "atom", line)?;
    }
    let resolve = |index: usize| {
        atoms
            .get(&index)
            .copied()
            .ok_or_else(|| build_error(line, BuildError::AtomIndexOutOfRange(index)))
    };
    let mut bond = Bond::new(resolve(ends[0])?, resolve(ends[1])?, bond_type);
    if let Some(code) = keyword_int(record, "TOPO", line)? {
        bond.topology = BondTopology::from_code(code).ok_or_else(|| unexpected("topology 0-2", code, line))?;
    }
    if let Some(status) = keyword_int(record, "RXCTR", line)? {
        bond.reacting_center = status as i32;
    }
    if let Some(cfg) = keyword_int(record, "CFG", line)? {
        bond.stereo = BondStereo::from_v3000_cfg(cfg).ok_or_else(|| unexpected("CFG 0-3", cfg, line))?;
    }
    Ok((index, bond))
}

fn parse_collection(
    record: &Record,
    atoms: &HashMap<usize, AtomId>,
    stereo: &mut EnhancedStereo,
    line: usize,
) -> Result<(), MolfileError> {
    let name = record.positional(0).unwrap_or_default();
    let Some(kind) = name.strip_prefix("MDLV30/") else {
        debug!("Ignoring collection '{}' on line {}", name, line);
        return Ok(());
    };
    let members = match record.get("ATOMS") {
        Some(list) => resolve_list(list, atoms, "atom", line)?,
        None => Vec::new(),
    };
    let label = |suffix: &str| -> Result<u32, MolfileError> {
        Ok(parse_int_token(suffix, "stereo group label", line)?.max(0) as u32)
    };
    if kind == "STEABS" {
        stereo.absolute.extend(members);
    } else if let Some(suffix) = kind.strip_prefix("STEREL") {
        stereo.relative.entry(label(suffix)?).or_default().extend(members);
    } else if let Some(suffix) = kind.strip_prefix("STERAC") {
        stereo.racemic.entry(label(suffix)?).or_default().extend(members);
    } else {
        debug!("Ignoring collection '{}' on line {}", name, line);
    }
    Ok(())
}

/// Reads one connection table; the `BEGIN CTAB` record has been consumed.
pub(super) fn read_ctab3000(cursor: &mut LineCursor) -> Result<Structure, MolfileError> {
    let mut structure = Structure::new();
    let mut atoms: HashMap<usize, AtomId> = HashMap::new();
    let mut bonds: HashMap<usize, BondId> = HashMap::new();
    let mut stereo = EnhancedStereo::new();
    let mut pending = BTreeMap::new();

    loop {
        let body = next_in_block(cursor, "CTAB")?;
        let line = cursor.line_no();
        match body.as_str() {
            "END CTAB" => break,
            "BEGIN ATOM" => loop {
                let body = next_in_block(cursor, "ATOM")?;
                if body == "END ATOM" {
                    break;
                }
                let line = cursor.line_no();
                let (index, atom) = parse_atom_record(&parse_record(&body, line)?, line)?;
                atoms.insert(index, structure.add_atom(atom));
            },
            "BEGIN BOND" => loop {
                let body = next_in_block(cursor, "BOND")?;
                if body == "END BOND" {
                    break;
                }
                let line = cursor.line_no();
                let (index, bond) = parse_bond_record(&parse_record(&body, line)?, &atoms, line)?;
                let id = structure.add_bond(bond).ok_or_else(|| {
                    build_error(line, BuildError::InvalidBond { begin: index, end: index })
                })?;
                bonds.insert(index, id);
            },
            "BEGIN COLLECTION" => loop {
                let body = next_in_block(cursor, "COLLECTION")?;
                if body == "END COLLECTION" {
                    break;
                }
                let line = cursor.line_no();
                parse_collection(&parse_record(&body, line)?, &atoms, &mut stereo, line)?;
            },
            "BEGIN SGROUP" => loop {
                let body = next_in_block(cursor, "SGROUP")?;
                if body == "END SGROUP" {
                    break;
                }
                let line = cursor.line_no();
                let (seq, group) = parse_sgroup3000(&parse_record(&body, line)?, &atoms, &bonds, line)?;
                pending.insert(seq, group);
            },
            other if other.starts_with("COUNTS") => {
                let record = parse_record(other, line)?;
                if let Some(flag) = record.positional(5) {
                    structure.is_chiral = parse_int_token(flag, "chiral flag", line)? != 0;
                }
            }
            other => match other.strip_prefix("BEGIN ") {
                Some(block) => {
                    debug!("Skipping unsupported block '{}' on line {}", block, line);
                    cursor.skip_block(block)?;
                }
                None => debug!("Skipping record '{}' on line {}", other, line),
            },
        }
    }

    attach_sgroups(&mut structure, pending)?;
    *structure.enhanced_stereo_mut() = stereo;
    Ok(structure)
}

/// Reads the body of a V3000 molfile after its counts line, through the
/// closing `M  END`: the main table and any `RGROUP` blocks.
pub(super) fn read_body3000(cursor: &mut LineCursor) -> Result<Structure, MolfileError> {
    let mut structure: Option<Structure> = None;
    let mut rgroups = Vec::new();

    loop {
        let Some(next) = cursor.peek() else {
            return Err(cursor.error(ParseErrorKind::MissingRecord("M  END".to_string())));
        };
        if next.trim_end() == "M  END" {
            cursor.next_line("M  END")?;
            break;
        }
        if !next.starts_with("M  V30") {
            cursor.next_line("V3000 record")?;
            debug!("Skipping non-V3000 line {}: '{}'", cursor.line_no(), next);
            continue;
        }
        let body = cursor.next_v30()?;
        let line = cursor.line_no();
        if body == "BEGIN CTAB" {
            let ctab = read_ctab3000(cursor)?;
            match &mut structure {
                Some(existing) => {
                    existing.merge(&ctab);
                }
                None => structure = Some(ctab),
            }
        } else if let Some(number) = body.strip_prefix("BEGIN RGROUP") {
            let number = parse_int_token(number.trim(), "R-group number", line)?.max(0) as u32;
            rgroups.push(read_rgroup3000(cursor, number)?);
        } else if let Some(block) = body.strip_prefix("BEGIN ") {
            debug!("Skipping unsupported block '{}' on line {}", block, line);
            cursor.skip_block(block)?;
        } else {
            debug!("Skipping record '{}' on line {}", body, line);
        }
    }

    let mut structure = structure.unwrap_or_default();
    for rgroup in rgroups {
        rgroup.attach_to(&mut structure);
    }
    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_body(text: &str) -> Result<Structure, MolfileError> {
        read_body3000(&mut LineCursor::new(text))
    }

    const ALANINE: &str = "\
M  V30 BEGIN CTAB
M  V30 COUNTS 4 3 0 0 1
M  V30 BEGIN ATOM
M  V30 1 C 0.0000 0.0000 0.0000 0
M  V30 2 C 1.0000 -1.0000 0.0000 3 CHG=1 MASS=13
M  V30 3 O 2.0000 0.0000 0.0000 0 VAL=-1 RAD=2
M  V30 4 N -1.0000 0.0000 0.0000 0 HCOUNT=2 ATTCHPT=-1
M  V30 END ATOM
M  V30 BEGIN BOND
M  V30 1 1 1 2 CFG=3
M  V30 2 2 2 3 TOPO=2 RXCTR=4
M  V30 3 1 1 4
M  V30 END BOND
M  V30 BEGIN COLLECTION
M  V30 MDLV30/STEABS ATOMS=(1 2)
M  V30 MDLV30/STEREL3 ATOMS=(2 1 4)
M  V30 END COLLECTION
M  V30 END CTAB
M  END
";

    #[test]
    fn reads_atoms_bonds_and_collections() {
        let structure = read_body(ALANINE).unwrap();
        assert!(structure.is_chiral);
        let atoms: Vec<(AtomId, &Atom)> = structure.atoms_iter().collect();
        assert_eq!(atoms.len(), 4);
        assert_eq!(atoms[1].1.position, Point3::new(1.0, 1.0, 0.0));
        assert_eq!(atoms[1].1.charge, 1);
        assert_eq!(atoms[1].1.isotope, 13);
        assert_eq!(atoms[1].1.aam, 3);
        assert_eq!(atoms[2].1.explicit_valence, Some(0));
        assert_eq!(atoms[2].1.radical, Radical::Doublet);
        assert_eq!(atoms[3].1.attachment_point, Some(AttachmentPoint::Both));

        let bonds: Vec<&Bond> = structure.bonds_iter().map(|(_, b)| b).collect();
        assert_eq!(bonds[0].stereo, BondStereo::Down);
        assert_eq!(bonds[1].topology, BondTopology::Chain);
        assert_eq!(bonds[1].reacting_center, 4);

        let stereo = structure.enhanced_stereo();
        assert_eq!(stereo.absolute, vec![atoms[1].0]);
        assert_eq!(stereo.relative[&3], vec![atoms[0].0, atoms[3].0]);
    }

    #[test]
    fn atom_types_map_to_lists_and_pseudo_atoms() {
        let text = "\
M  V30 BEGIN CTAB
M  V30 COUNTS 3 0 0 0 0
M  V30 BEGIN ATOM
M  V30 1 \"NOT [N,O]\" 0 0 0 0
M  V30 2 \"Boc group\" 0 0 0 0
M  V30 3 R# 0 0 0 0 RGROUPS=(2 1 4)
M  V30 END ATOM
M  V30 END CTAB
M  END
";
        let structure = read_body(text).unwrap();
        let atoms: Vec<&Atom> = structure.atoms_iter().map(|(_, a)| a).collect();
        assert_eq!(atoms[0].label, "L");
        assert!(atoms[0].atom_list.as_ref().unwrap().negated);
        assert_eq!(atoms[1].pseudo.as_deref(), Some("Boc group"));
        assert_eq!(atoms[2].rgroup_ids(), vec![1, 4]);
    }

    #[test]
    fn rgroup_numbers_beyond_the_mask_are_rejected() {
        let text = "\
M  V30 BEGIN CTAB
M  V30 COUNTS 1 0 0 0 0
M  V30 BEGIN ATOM
M  V30 1 R# 0 0 0 0 RGROUPS=(2 1 40)
M  V30 END ATOM
M  V30 END CTAB
M  END
";
        assert!(matches!(
            read_body(text),
            Err(MolfileError::Parse {
                line: 4,
                kind: ParseErrorKind::IndexOutOfRange { what: "R-group", index: 40 }
            })
        ));
    }

    #[test]
    fn unknown_blocks_are_skipped() {
        let text = ALANINE.replace(
            "M  V30 END CTAB",
            "M  V30 BEGIN OBJ3D\nM  V30 1 -1 0 0 0\nM  V30 END OBJ3D\nM  V30 END CTAB",
        );
        assert_eq!(read_body(&text).unwrap().atom_count(), 4);
    }

    #[test]
    fn unterminated_blocks_are_reported() {
        let text = "M  V30 BEGIN CTAB\nM  V30 BEGIN ATOM\nM  V30 1 C 0 0 0 0\n";
        assert!(matches!(
            read_body(text),
            Err(MolfileError::Parse {
                kind: ParseErrorKind::UnbalancedBlock(_),
                ..
            })
        ));
    }

    #[test]
    fn bonds_to_unknown_atoms_are_rejected() {
        let text = ALANINE.replace("M  V30 3 1 1 4", "M  V30 3 1 1 9");
        assert!(matches!(
            read_body(&text),
            Err(MolfileError::Parse {
                line: 12,
                kind: ParseErrorKind::IndexOutOfRange { what: "atom", index: 9 }
            })
        ));
    }

    #[test]
    fn sgroups_are_linked_by_sequence_number() {
        let text = ALANINE.replace(
            "M  V30 END CTAB",
            "M  V30 BEGIN SGROUP\n\
             M  V30 1 GEN 0 ATOMS=(2 1 2)\n\
             M  V30 2 SRU 0 ATOMS=(1 2) XBONDS=(2 1 2) CONNECT=HH LABEL=m PARENT=1\n\
             M  V30 END SGROUP\n\
             M  V30 END CTAB",
        );
        let structure = read_body(&text).unwrap();
        let order = structure.sgroups_bfs();
        let child = structure.sgroup(order[1]).unwrap();
        assert_eq!(child.parent, Some(order[0]));
        assert_eq!(child.crossing_bonds.len(), 2);
    }
}
