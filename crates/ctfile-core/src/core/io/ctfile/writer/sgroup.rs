use super::numbered;
use crate::core::io::ctfile::primitives::{
    LineBuffer, format_decimal, padded_float, padded_number, padded_text,
};
use crate::core::io::ctfile::v3000::{format_list, quote};
use crate::core::io::error::MolfileError;
use crate::core::models::ids::{AtomId, SGroupId};
use crate::core::models::sgroup::{Connectivity, DataField, SGroup, SGroupKind};
use crate::core::models::structure::Structure;
use nalgebra::Point2;
use std::collections::HashMap;

const INDICES_PER_LINE: usize = 15;
const DATA_CHUNK: usize = 69;

/// The 45-character data display record shared by `M  SDD` and `FIELDDISP=`.
pub(super) fn display_record(field: &DataField, position: Point2<f64>) -> Result<String, MolfileError> {
    let display = &field.display;
    let chars = match display.chars_to_display {
        None => "ALL".to_string(),
        Some(n) if n < 1000 => format!("{n:03}"),
        Some(n) => {
            return Err(MolfileError::LossyEncoding(format!(
                "{n} characters to display does not fit in 3 columns"
            )));
        }
    };
    if display.dasp_position > 9 {
        return Err(MolfileError::LossyEncoding(format!(
            "DASP position {} is outside 0-9",
            display.dasp_position
        )));
    }
    Ok(format!(
        "{}{}    {}{}{}   {}001    {} {}  ",
        padded_float(position.x, 10, 4, "data x coordinate")?,
        padded_float(-position.y, 10, 4, "data y coordinate")?,
        if display.attached { 'A' } else { 'D' },
        if display.absolute { 'A' } else { 'R' },
        if display.show_units { 'U' } else { ' ' },
        chars,
        display.tag.unwrap_or(' '),
        display.dasp_position,
    ))
}

/// Breadth-first sequence numbers, 1-based.
fn sequence_numbers(order: &[SGroupId]) -> HashMap<SGroupId, usize> {
    order
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index + 1))
        .collect()
}

fn write_index_lists(
    buf: &mut LineBuffer,
    tag: &str,
    seq: usize,
    indices: &[usize],
) -> Result<(), MolfileError> {
    for chunk in indices.chunks(INDICES_PER_LINE) {
        let mut line = format!(
            "M  {tag} {}{}",
            padded_number(seq as i64, 3, "S-group index")?,
            padded_number(chunk.len() as i64, 3, tag)?
        );
        for &index in chunk {
            line.push(' ');
            line.push_str(&padded_number(index as i64, 3, tag)?);
        }
        buf.line(&line);
    }
    Ok(())
}

fn write_data_fields2000(
    buf: &mut LineBuffer,
    seq: &str,
    field: &DataField,
) -> Result<(), MolfileError> {
    let sdt = format!(
        "M  SDT {seq} {}{}{}{}{}",
        padded_text(&field.field_name, 30, "data field name")?,
        padded_text(&field.field_type, 2, "data field type")?,
        padded_text(&field.units, 20, "data field units")?,
        padded_text(&field.query, 2, "data query type")?,
        field.query_op
    );
    buf.line(sdt.trim_end());
    if let Some(position) = field.position {
        buf.line(&format!("M  SDD {seq} {}", display_record(field, position)?));
    }

    let chars: Vec<char> = field.field_value.chars().collect();
    let mut chunks: Vec<String> = chars
        .chunks(DATA_CHUNK)
        .map(|chunk| chunk.iter().collect())
        .collect();
    let last = chunks.pop().unwrap_or_default();
    for chunk in chunks {
        buf.line(&format!("M  SCD {seq} {chunk}"));
    }
    buf.line(&format!("M  SED {seq} {last}"));
    Ok(())
}

fn write_brackets2000(buf: &mut LineBuffer, seq: &str, sgroup: &SGroup) -> Result<(), MolfileError> {
    let Some(bbox) = sgroup.bracket_box else {
        return Ok(());
    };
    for x in [bbox.min.x, bbox.max.x] {
        buf.line(&format!(
            "M  SDI {seq}  4{}{}{}{}",
            padded_float(x, 10, 4, "bracket x")?,
            padded_float(-bbox.min.y, 10, 4, "bracket y")?,
            padded_float(x, 10, 4, "bracket x")?,
            padded_float(-bbox.max.y, 10, 4, "bracket y")?,
        ));
    }
    Ok(())
}

/// Writes every S-group of `structure` as V2000 `M  S..` records, in
/// breadth-first order.
pub(super) fn write_sgroups2000(
    buf: &mut LineBuffer,
    structure: &Structure,
    atom_numbers: &HashMap<AtomId, usize>,
) -> Result<(), MolfileError> {
    let order = structure.sgroups_bfs();
    let sequence = sequence_numbers(&order);
    let bond_numbers = structure.bond_numbering();

    for (position, &id) in order.iter().enumerate() {
        let Some(sgroup) = structure.sgroup(id) else {
            continue;
        };
        let number = position + 1;
        let seq = padded_number(number as i64, 3, "S-group index")?;

        buf.line(&format!("M  STY  1 {seq} {}", sgroup.tag()));
        buf.line(&format!("M  SLB  1 {seq} {seq}"));
        if let Some(parent) = sgroup.parent.and_then(|parent| sequence.get(&parent)) {
            buf.line(&format!(
                "M  SPL  1 {seq} {}",
                padded_number(*parent as i64, 3, "S-group parent")?
            ));
        }
        if let SGroupKind::RepeatUnit {
            subscript,
            connectivity,
        } = &sgroup.kind
        {
            if *connectivity != Connectivity::default() {
                buf.line(&format!("M  SCN  1 {seq} {:<3}", connectivity.keyword()));
            }
            let subscript = if subscript.is_empty() { "n" } else { subscript };
            buf.line(&format!("M  SMT {seq} {subscript}"));
        }

        write_index_lists(buf, "SAL", number, &numbered(atom_numbers, &sgroup.atoms, "atom")?)?;
        write_index_lists(
            buf,
            "SBL",
            number,
            &numbered(&bond_numbers, &sgroup.crossing_bonds, "bond")?,
        )?;
        if let Some(patoms) = &sgroup.patoms {
            write_index_lists(buf, "SPA", number, &numbered(atom_numbers, patoms, "atom")?)?;
        }

        match &sgroup.kind {
            SGroupKind::Superatom { name } if !name.is_empty() => {
                buf.line(&format!("M  SMT {seq} {name}"));
            }
            SGroupKind::Multiple { multiplier } => {
                buf.line(&format!("M  SMT {seq} {multiplier}"));
            }
            SGroupKind::Data(field) => write_data_fields2000(buf, &seq, field)?,
            _ => {}
        }
        write_brackets2000(buf, &seq, sgroup)?;
    }
    Ok(())
}

fn data_attributes3000(field: &DataField) -> Result<String, MolfileError> {
    let mut details = String::new();
    if !field.field_name.is_empty() {
        details.push_str(&format!(" FIELDNAME={}", quote(&field.field_name)));
    }
    if !field.units.is_empty() {
        details.push_str(&format!(" FIELDINFO={}", quote(&field.units)));
    }
    if let Some(position) = field.position {
        details.push_str(&format!(
            " FIELDDISP={}",
            quote(&display_record(field, position)?)
        ));
    }
    if !field.query.is_empty() {
        details.push_str(&format!(" QUERYTYPE={}", quote(&field.query)));
    }
    if !field.query_op.is_empty() {
        details.push_str(&format!(" QUERYOP={}", quote(&field.query_op)));
    }
    if !field.field_value.is_empty() {
        details.push_str(&format!(" FIELDDATA={}", quote(&field.field_value)));
    }
    Ok(details)
}

/// Writes the V3000 `SGROUP` block; nothing is written without S-groups.
pub(super) fn write_sgroups3000(
    buf: &mut LineBuffer,
    structure: &Structure,
    atom_numbers: &HashMap<AtomId, usize>,
) -> Result<(), MolfileError> {
    let order = structure.sgroups_bfs();
    if order.is_empty() {
        return Ok(());
    }
    let sequence = sequence_numbers(&order);
    let bond_numbers = structure.bond_numbering();

    buf.line("M  V30 BEGIN SGROUP");
    for (position, &id) in order.iter().enumerate() {
        let Some(sgroup) = structure.sgroup(id) else {
            continue;
        };
        let mut details = format!("{} {} 0", position + 1, sgroup.tag());
        if !sgroup.atoms.is_empty() {
            let atoms = numbered(atom_numbers, &sgroup.atoms, "atom")?;
            details.push_str(&format!(" ATOMS={}", format_list(&atoms)));
        }
        if !sgroup.crossing_bonds.is_empty() {
            let bonds = numbered(&bond_numbers, &sgroup.crossing_bonds, "bond")?;
            details.push_str(&format!(" XBONDS={}", format_list(&bonds)));
        }
        if let Some(patoms) = &sgroup.patoms {
            let patoms = numbered(atom_numbers, patoms, "atom")?;
            details.push_str(&format!(" PATOMS={}", format_list(&patoms)));
        }

        match &sgroup.kind {
            SGroupKind::Data(field) => details.push_str(&data_attributes3000(field)?),
            SGroupKind::RepeatUnit {
                subscript,
                connectivity,
            } => {
                let subscript = if subscript.is_empty() { "n" } else { subscript };
                details.push_str(&format!(
                    " CONNECT={} LABEL={}",
                    connectivity.keyword(),
                    quote(subscript)
                ));
            }
            SGroupKind::Superatom { name } if !name.is_empty() => {
                details.push_str(&format!(" LABEL={}", quote(name)));
            }
            SGroupKind::Multiple { multiplier } => {
                details.push_str(&format!(" MULT={multiplier}"));
            }
            _ => {}
        }

        if let Some(parent) = sgroup.parent.and_then(|parent| sequence.get(&parent)) {
            details.push_str(&format!(" PARENT={parent}"));
        }
        if let Some(bbox) = sgroup.bracket_box {
            details.push_str(&format!(
                " BRKXYZ=(9 {} {} 0 {} {} 0 0 0 0)",
                format_decimal(bbox.min.x, 4),
                format_decimal(-bbox.min.y, 4),
                format_decimal(bbox.max.x, 4),
                format_decimal(-bbox.max.y, 4),
            ));
        }
        buf.v30(&details);
    }
    buf.line("M  V30 END SGROUP");
    Ok(())
}
