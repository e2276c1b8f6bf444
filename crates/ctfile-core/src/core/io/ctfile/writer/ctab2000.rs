use super::numbered;
use super::sgroup::write_sgroups2000;
use crate::core::io::ctfile::primitives::{LineBuffer, padded_float, padded_number, padded_text};
use crate::core::io::error::MolfileError;
use crate::core::models::atom::{ATOM_LIST_LABEL, Atom};
use crate::core::models::ids::AtomId;
use crate::core::models::rgroup::RGroup;
use crate::core::models::structure::Structure;
use crate::core::utils::elements::is_known_label;
use std::collections::HashMap;

const PROPERTIES_PER_LINE: usize = 8;

/// Valence code of the V2000 `vvv` column: 0 is "unset", 15 is an explicit zero.
fn valence_code(atom: &Atom) -> Result<i64, MolfileError> {
    match atom.explicit_valence {
        None => Ok(0),
        Some(0) => Ok(15),
        Some(v) if v < 15 => Ok(i64::from(v)),
        Some(v) => Err(MolfileError::LossyEncoding(format!(
            "explicit valence {v} cannot be written in V2000"
        ))),
    }
}

/// Chooses the 3-character label column and the optional `A` text record.
fn atom_label(atom: &Atom) -> (String, Option<String>) {
    if atom.atom_list.is_some() {
        return (ATOM_LIST_LABEL.to_string(), None);
    }
    if let Some(pseudo) = &atom.pseudo {
        if pseudo.chars().count() > 3 {
            return ("A".to_string(), Some(format!("'{pseudo}'")));
        }
        return (pseudo.clone(), None);
    }
    if !is_known_label(&atom.label) {
        return ("C".to_string(), Some(format!("'{}'", atom.label)));
    }
    (atom.label.clone(), atom.alias.clone())
}

fn atom_line(atom: &Atom, label: &str) -> Result<String, MolfileError> {
    let mut line = String::with_capacity(69);
    line.push_str(&padded_float(atom.position.x, 10, 4, "x coordinate")?);
    line.push_str(&padded_float(-atom.position.y, 10, 4, "y coordinate")?);
    line.push_str(&padded_float(atom.position.z, 10, 4, "z coordinate")?);
    line.push(' ');
    line.push_str(&padded_text(label, 3, "atom label")?);
    line.push_str(" 0  0  0");
    line.push_str(&padded_number(i64::from(atom.hydrogen_count), 3, "hydrogen count")?);
    line.push_str(&padded_number(i64::from(atom.stereo_care), 3, "stereo care")?);
    line.push_str(&padded_number(valence_code(atom)?, 3, "valence")?);
    line.push_str("  0  0  0");
    line.push_str(&padded_number(i64::from(atom.aam), 3, "atom mapping")?);
    line.push_str(&padded_number(i64::from(atom.inversion), 3, "inversion flag")?);
    line.push_str(&padded_number(i64::from(atom.exact_change), 3, "exact change flag")?);
    Ok(line)
}

/// Writes `M  XXX` property lists, eight `(atom, value)` pairs per line.
fn write_property_list(
    buf: &mut LineBuffer,
    tag: &str,
    entries: &[(usize, i64)],
) -> Result<(), MolfileError> {
    for chunk in entries.chunks(PROPERTIES_PER_LINE) {
        let mut line = format!("M  {tag}{}", padded_number(chunk.len() as i64, 3, tag)?);
        for &(index, value) in chunk {
            line.push(' ');
            line.push_str(&padded_number(index as i64, 3, "atom index")?);
            line.push(' ');
            line.push_str(&padded_number(value, 3, tag)?);
        }
        buf.line(&line);
    }
    Ok(())
}

fn logic_line(number: u32, rgroup: &RGroup) -> Result<String, MolfileError> {
    Ok(format!(
        "M  LOG  1 {} {} {}   {}",
        padded_number(i64::from(number), 3, "R-group number")?,
        padded_number(i64::from(rgroup.if_then), 3, "IFTHEN")?,
        padded_number(i64::from(rgroup.rest_h), 3, "RESTH")?,
        rgroup.range
    ))
}

#[derive(Default)]
struct PropertyLists {
    charge: Vec<(usize, i64)>,
    isotope: Vec<(usize, i64)>,
    radical: Vec<(usize, i64)>,
    rgroup: Vec<(usize, i64)>,
    attachment: Vec<(usize, i64)>,
    ring_bonds: Vec<(usize, i64)>,
    substitution: Vec<(usize, i64)>,
    unsaturated: Vec<(usize, i64)>,
}

impl PropertyLists {
    fn record(&mut self, index: usize, atom: &Atom) {
        if atom.charge != 0 {
            self.charge.push((index, i64::from(atom.charge)));
        }
        if atom.isotope != 0 {
            self.isotope.push((index, i64::from(atom.isotope)));
        }
        if atom.radical.code() != 0 {
            self.radical.push((index, atom.radical.code()));
        }
        if atom.is_rgroup_site() {
            for rgroup in atom.rgroup_ids() {
                self.rgroup.push((index, i64::from(rgroup)));
            }
        }
        if let Some(point) = atom.attachment_point {
            self.attachment.push((index, point.v2000_code()));
        }
        if atom.ring_bond_count != 0 {
            self.ring_bonds.push((index, i64::from(atom.ring_bond_count)));
        }
        if atom.substitution_count != 0 {
            self.substitution.push((index, i64::from(atom.substitution_count)));
        }
        if atom.unsaturated != 0 {
            self.unsaturated.push((index, i64::from(atom.unsaturated)));
        }
    }
}

/// Writes the connection table of `structure`: counts line, atom and bond
/// blocks, text records, property lists, S-groups and the `M  END` marker.
///
/// `logic` carries the R-groups whose `M  LOG` records belong to this table;
/// it is only non-empty for the scaffold of an R-group file.
pub(super) fn write_ctab2000(
    buf: &mut LineBuffer,
    structure: &Structure,
    logic: &[(u32, &RGroup)],
) -> Result<(), MolfileError> {
    buf.line(&format!(
        "{}{}  0   {}  0            999 V2000",
        padded_number(structure.atom_count() as i64, 3, "atom count")?,
        padded_number(structure.bond_count() as i64, 3, "bond count")?,
        padded_number(i64::from(structure.is_chiral), 3, "chiral flag")?,
    ));

    let atom_numbers: HashMap<AtomId, usize> = structure.atom_numbering();
    let mut texts = Vec::new();
    let mut lists = PropertyLists::default();
    let mut atom_lists = Vec::new();

    for (position, (_, atom)) in structure.atoms_iter().enumerate() {
        let index = position + 1;
        let (label, text) = atom_label(atom);
        buf.line(&atom_line(atom, &label)?);
        if let Some(text) = text {
            texts.push((index, text));
        }
        if let Some(list) = &atom.atom_list {
            atom_lists.push((index, list));
        }
        lists.record(index, atom);
    }

    for (_, bond) in structure.bonds_iter() {
        let ends = numbered(&atom_numbers, &[bond.begin, bond.end], "atom")?;
        buf.line(&format!(
            "{}{}{}{}{}{}{}",
            padded_number(ends[0] as i64, 3, "bond begin")?,
            padded_number(ends[1] as i64, 3, "bond end")?,
            padded_number(bond.bond_type.code(), 3, "bond type")?,
            padded_number(bond.stereo.v2000_code(), 3, "bond stereo")?,
            padded_text(&bond.display, 3, "bond display field")?,
            padded_number(bond.topology.code(), 3, "bond topology")?,
            padded_number(i64::from(bond.reacting_center), 3, "reacting center")?,
        ));
    }

    for (index, text) in &texts {
        buf.line(&format!("A  {}", padded_number(*index as i64, 3, "atom index")?));
        buf.line(text);
    }

    write_property_list(buf, "CHG", &lists.charge)?;
    write_property_list(buf, "ISO", &lists.isotope)?;
    write_property_list(buf, "RAD", &lists.radical)?;
    write_property_list(buf, "RGP", &lists.rgroup)?;
    for (number, rgroup) in logic {
        if rgroup.has_logic() {
            buf.line(&logic_line(*number, rgroup)?);
        }
    }
    write_property_list(buf, "APO", &lists.attachment)?;
    write_property_list(buf, "RBC", &lists.ring_bonds)?;
    write_property_list(buf, "SUB", &lists.substitution)?;
    write_property_list(buf, "UNS", &lists.unsaturated)?;

    for (index, list) in atom_lists {
        let mut line = format!(
            "M  ALS{}{} {}",
            padded_number(index as i64, 4, "atom index")?,
            padded_number(list.labels.len() as i64, 3, "atom list length")?,
            if list.negated { 'T' } else { 'F' }
        );
        for label in &list.labels {
            line.push(' ');
            line.push_str(&padded_text(label, 3, "atom list entry")?);
        }
        buf.line(&line);
    }

    write_sgroups2000(buf, structure, &atom_numbers)?;
    buf.line("M  END");
    Ok(())
}
