use super::sgroup::{SGroupRecords2000, attach_sgroups};
use super::{LineCursor, build_error, rgroup_out_of_range};
use crate::core::io::ctfile::primitives::{
    parse_float_field, parse_int_field, parse_int_token, slice_and_trim,
};
use crate::core::io::error::{MolfileError, ParseErrorKind};
use crate::core::models::atom::{ATOM_LIST_LABEL, Atom, AtomList, AttachmentPoint, Radical};
use crate::core::models::builder::StructureBuilder;
use crate::core::models::rgroup::RGroup;
use crate::core::models::structure::Structure;
use crate::core::models::topology::{Bond, BondStereo, BondTopology, BondType};
use crate::core::utils::elements::is_known_label;
use nalgebra::Point3;
use tracing::debug;

const MIN_ATOM_LINE: usize = 34;
const MIN_BOND_LINE: usize = 9;

/// A V2000 connection table together with the R-group logic records found
/// in its property block.
#[derive(Debug)]
pub(super) struct Ctab2000 {
    pub structure: Structure,
    pub logic: Vec<(u32, RGroup)>,
}

fn require_length(line: &str, expected: usize, line_no: usize) -> Result<(), MolfileError> {
    if line.len() < expected {
        return Err(MolfileError::parse(
            line_no,
            ParseErrorKind::LineTooShort { expected },
        ));
    }
    Ok(())
}

fn unexpected(expected: &str, found: impl ToString, line_no: usize) -> MolfileError {
    MolfileError::parse(
        line_no,
        ParseErrorKind::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
        },
    )
}

/// Applies the legacy `ccc` charge column of an atom line.
fn apply_charge_code(atom: &mut Atom, code: i64) {
    match code {
        1 => atom.charge = 3,
        2 => atom.charge = 2,
        3 => atom.charge = 1,
        4 => atom.radical = Radical::Doublet,
        5 => atom.charge = -1,
        6 => atom.charge = -2,
        7 => atom.charge = -3,
        _ => {}
    }
}

fn parse_atom_line(line: &str, line_no: usize) -> Result<Atom, MolfileError> {
    require_length(line, MIN_ATOM_LINE, line_no)?;
    let x = parse_float_field(line, 0, 10, line_no)?;
    let y = parse_float_field(line, 10, 20, line_no)?;
    let z = parse_float_field(line, 20, 30, line_no)?;
    let label = slice_and_trim(line, 31, 34);

    let mut atom = Atom::new(label, Point3::new(x, -y, z));
    if !is_known_label(label) && label != ATOM_LIST_LABEL {
        atom.pseudo = Some(label.to_string());
    }
    apply_charge_code(&mut atom, parse_int_field(line, 36, 39, line_no)?);
    atom.hydrogen_count = parse_int_field(line, 42, 45, line_no)? as i32;
    atom.stereo_care = parse_int_field(line, 45, 48, line_no)? as i32;
    atom.explicit_valence = match parse_int_field(line, 48, 51, line_no)? {
        0 => None,
        15 => Some(0),
        v @ 1..=14 => Some(v as u8),
        v => return Err(unexpected("valence code 0-15", v, line_no)),
    };
    atom.aam = parse_int_field(line, 60, 63, line_no)?.max(0) as u32;
    atom.inversion = parse_int_field(line, 63, 66, line_no)? as i32;
    atom.exact_change = parse_int_field(line, 66, 69, line_no)? as i32;
    Ok(atom)
}

fn parse_bond_line(
    builder: &mut StructureBuilder,
    line: &str,
    line_no: usize,
) -> Result<(), MolfileError> {
    require_length(line, MIN_BOND_LINE, line_no)?;
    let begin = parse_int_field(line, 0, 3, line_no)?.max(0) as usize;
    let end = parse_int_field(line, 3, 6, line_no)?.max(0) as usize;
    let type_code = parse_int_field(line, 6, 9, line_no)?;
    let bond_type =
        BondType::from_code(type_code).ok_or_else(|| unexpected("bond type 1-10", type_code, line_no))?;

    let begin_id = builder.resolve_atom(begin).map_err(|e| build_error(line_no, e))?;
    let end_id = builder.resolve_atom(end).map_err(|e| build_error(line_no, e))?;
    let mut bond = Bond::new(begin_id, end_id, bond_type);

    let stereo_code = parse_int_field(line, 9, 12, line_no)?;
    bond.stereo = BondStereo::from_v2000_code(stereo_code)
        .ok_or_else(|| unexpected("bond stereo 0, 1, 3, 4 or 6", stereo_code, line_no))?;
    let display = slice_and_trim(line, 12, 15);
    if display != "0" {
        bond.display = display.to_string();
    }
    let topology_code = parse_int_field(line, 15, 18, line_no)?;
    bond.topology = BondTopology::from_code(topology_code)
        .ok_or_else(|| unexpected("bond topology 0-2", topology_code, line_no))?;
    bond.reacting_center = parse_int_field(line, 18, 21, line_no)? as i32;

    builder
        .push_bond(bond, begin, end)
        .map_err(|e| build_error(line_no, e))?;
    Ok(())
}

/// Applies a text record (`A  iii` followed by the text line).
fn apply_text(atom: &mut Atom, text: &str) {
    let quoted = text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''));
    match quoted {
        Some(pseudo) => {
            atom.label = pseudo.to_string();
            atom.pseudo = Some(pseudo.to_string());
        }
        None => atom.alias = Some(text.to_string()),
    }
}

/// `(count, [(index, value)...])` pairs of an `M  XXX` property list.
fn property_pairs(text: &str, line_no: usize) -> Result<Vec<(usize, i64)>, MolfileError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((count, rest)) = tokens.split_first() else {
        return Ok(Vec::new());
    };
    let count = parse_int_token(count, "entry count", line_no)?.max(0) as usize;
    if rest.len() < count * 2 {
        return Err(MolfileError::parse(
            line_no,
            ParseErrorKind::MissingRecord(format!("{count} property entries")),
        ));
    }
    rest.chunks_exact(2)
        .take(count)
        .map(|pair| {
            let index = parse_int_token(pair[0], "atom index", line_no)?.max(0) as usize;
            let value = parse_int_token(pair[1], "property value", line_no)?;
            Ok((index, value))
        })
        .collect()
}

fn parse_logic(text: &str, line_no: usize) -> Result<(u32, RGroup), MolfileError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(MolfileError::parse(
            line_no,
            ParseErrorKind::MissingRecord("R-group logic fields".to_string()),
        ));
    }
    let number = parse_int_token(tokens[1], "R-group number", line_no)?.max(0) as u32;
    let mut rgroup = RGroup::new();
    rgroup.if_then = parse_int_token(tokens[2], "IFTHEN", line_no)?.max(0) as u32;
    rgroup.rest_h = parse_int_token(tokens[3], "RESTH", line_no)? != 0;
    rgroup.range = tokens[4..].join(" ");
    Ok((number, rgroup))
}

fn parse_atom_list(line: &str, line_no: usize) -> Result<(usize, AtomList), MolfileError> {
    let index = parse_int_field(line, 6, 10, line_no)?.max(0) as usize;
    let count = parse_int_field(line, 10, 13, line_no)?.max(0) as usize;
    let negated = match slice_and_trim(line, 14, 15) {
        "T" => true,
        "F" | "" => false,
        other => return Err(unexpected("T or F", other, line_no)),
    };
    let labels: Vec<&str> = line
        .get(15..)
        .unwrap_or_default()
        .split_whitespace()
        .take(count)
        .collect();
    if labels.len() != count || labels.is_empty() {
        return Err(MolfileError::parse(
            line_no,
            ParseErrorKind::InvalidAtomList(line.to_string()),
        ));
    }
    Ok((index, AtomList::new(labels, negated)))
}

/// Reads a V2000 connection table starting at its counts line, through
/// `M  END`.
pub(super) fn read_ctab2000(cursor: &mut LineCursor) -> Result<Ctab2000, MolfileError> {
    let counts = cursor.next_line("counts line")?;
    let line_no = cursor.line_no();
    require_length(counts, 6, line_no)?;
    let atom_count = parse_int_field(counts, 0, 3, line_no)?.max(0) as usize;
    let bond_count = parse_int_field(counts, 3, 6, line_no)?.max(0) as usize;
    let chiral = parse_int_field(counts, 12, 15, line_no)? != 0;

    let mut builder = StructureBuilder::new();
    builder.chiral(chiral);
    for _ in 0..atom_count {
        let line = cursor.next_line("atom line")?;
        builder.push_atom(parse_atom_line(line, cursor.line_no())?);
    }
    for _ in 0..bond_count {
        let line = cursor.next_line("bond line")?;
        parse_bond_line(&mut builder, line, cursor.line_no())?;
    }

    let mut logic = Vec::new();
    let mut sgroups = SGroupRecords2000::default();
    let mut legacy_charges = true;

    loop {
        let line = cursor.next_line("M  END")?;
        let line_no = cursor.line_no();
        if line.trim_end() == "M  END" {
            break;
        }
        if line.starts_with("A  ") {
            let index = parse_int_field(line, 3, 6, line_no)?.max(0) as usize;
            let text = cursor.next_line("atom text")?.trim_end();
            let id = builder.resolve_atom(index).map_err(|e| build_error(line_no, e))?;
            if let Some(atom) = builder.structure_mut().atom_mut(id) {
                apply_text(atom, text);
            }
            continue;
        }
        let Some(rest) = line.strip_prefix("M  ") else {
            debug!("Skipping unrecognized line {}: '{}'", line_no, line);
            continue;
        };
        let tag = rest.get(..3).unwrap_or(rest);
        let text = rest.get(3..).unwrap_or_default();

        match tag {
            "CHG" | "ISO" | "RAD" | "RGP" | "APO" | "RBC" | "SUB" | "UNS" => {
                if legacy_charges && matches!(tag, "CHG" | "RAD") {
                    legacy_charges = false;
                    let ids = builder.structure().atom_ids().to_vec();
                    for id in ids {
                        if let Some(atom) = builder.structure_mut().atom_mut(id) {
                            atom.charge = 0;
                            atom.radical = Radical::None;
                        }
                    }
                }
                for (index, value) in property_pairs(text, line_no)? {
                    let id = builder.resolve_atom(index).map_err(|e| build_error(line_no, e))?;
                    let Some(atom) = builder.structure_mut().atom_mut(id) else {
                        continue;
                    };
                    match tag {
                        "CHG" => atom.charge = value as i32,
                        "ISO" => atom.isotope = value as i32,
                        "RAD" => {
                            atom.radical = Radical::from_code(value)
                                .ok_or_else(|| unexpected("radical 0-3", value, line_no))?;
                        }
                        "RGP" => {
                            if !atom.add_rgroup(value.max(0) as u32) {
                                return Err(rgroup_out_of_range(value, line_no));
                            }
                        }
                        "APO" => {
                            atom.attachment_point = AttachmentPoint::from_v2000_code(value);
                        }
                        "RBC" => atom.ring_bond_count = value as i32,
                        "SUB" => atom.substitution_count = value as i32,
                        _ => atom.unsaturated = value as i32,
                    }
                }
            }
            "LOG" => logic.push(parse_logic(text, line_no)?),
            "ALS" => {
                let (index, list) = parse_atom_list(line, line_no)?;
                let id = builder.resolve_atom(index).map_err(|e| build_error(line_no, e))?;
                if let Some(atom) = builder.structure_mut().atom_mut(id) {
                    atom.label = ATOM_LIST_LABEL.to_string();
                    atom.pseudo = None;
                    atom.atom_list = Some(list);
                }
            }
            tag if SGroupRecords2000::handles(tag) => sgroups.record(tag, text, line_no)?,
            _ => debug!("Skipping unsupported property 'M  {}' on line {}", tag, line_no),
        }
    }

    let pending = sgroups.finish(&builder, cursor.line_no())?;
    let mut structure = builder.build();
    attach_sgroups(&mut structure, pending)?;
    Ok(Ctab2000 { structure, logic })
}
