use super::numbered;
use super::sgroup::write_sgroups3000;
use super::stereo::write_collection3000;
use crate::core::io::ctfile::primitives::{LineBuffer, format_decimal};
use crate::core::io::ctfile::v3000::{format_list, quote};
use crate::core::io::error::MolfileError;
use crate::core::models::atom::Atom;
use crate::core::models::structure::Structure;

/// The atom type token: list notation, pseudo text or the label verbatim.
fn atom_type(atom: &Atom) -> String {
    if let Some(list) = &atom.atom_list {
        return list.to_string();
    }
    match &atom.pseudo {
        Some(pseudo) => pseudo.clone(),
        None => atom.label.clone(),
    }
}

fn atom_record(index: usize, atom: &Atom) -> String {
    let mut details = format!(
        "{index} {} {} {} {} {}",
        quote(&atom_type(atom)),
        format_decimal(atom.position.x, 4),
        format_decimal(-atom.position.y, 4),
        format_decimal(atom.position.z, 4),
        atom.aam
    );
    if atom.charge != 0 {
        details.push_str(&format!(" CHG={}", atom.charge));
    }
    if atom.radical.code() != 0 {
        details.push_str(&format!(" RAD={}", atom.radical.code()));
    }
    match atom.explicit_valence {
        Some(0) => details.push_str(" VAL=-1"),
        Some(valence) => details.push_str(&format!(" VAL={valence}")),
        None => {}
    }
    if atom.hydrogen_count != 0 {
        details.push_str(&format!(" HCOUNT={}", atom.hydrogen_count));
    }
    if atom.inversion != 0 {
        details.push_str(&format!(" INVRET={}", atom.inversion));
    }
    if atom.exact_change != 0 {
        details.push_str(&format!(" EXACHG={}", atom.exact_change));
    }
    if atom.substitution_count != 0 {
        details.push_str(&format!(" SUBST={}", atom.substitution_count));
    }
    if atom.unsaturated != 0 {
        details.push_str(&format!(" UNSAT={}", atom.unsaturated));
    }
    if atom.ring_bond_count != 0 {
        details.push_str(&format!(" RBCNT={}", atom.ring_bond_count));
    }
    if let Some(point) = atom.attachment_point {
        details.push_str(&format!(" ATTCHPT={}", point.v3000_code()));
    }
    if atom.is_rgroup_site() && atom.rgroup_mask != 0 {
        details.push_str(&format!(" RGROUPS={}", format_list(&atom.rgroup_ids())));
    }
    if atom.isotope != 0 {
        details.push_str(&format!(" MASS={}", atom.isotope));
    }
    details
}

/// Writes one `BEGIN CTAB` ... `END CTAB` block.
pub(super) fn write_ctab3000(buf: &mut LineBuffer, structure: &Structure) -> Result<(), MolfileError> {
    buf.line("M  V30 BEGIN CTAB");
    buf.v30(&format!(
        "COUNTS {} {} {} 0 {}",
        structure.atom_count(),
        structure.bond_count(),
        structure.sgroup_count(),
        u8::from(structure.is_chiral)
    ));

    let atom_numbers = structure.atom_numbering();
    if structure.atom_count() > 0 {
        buf.line("M  V30 BEGIN ATOM");
        for (position, (_, atom)) in structure.atoms_iter().enumerate() {
            buf.v30(&atom_record(position + 1, atom));
        }
        buf.line("M  V30 END ATOM");
    }

    if structure.bond_count() > 0 {
        buf.line("M  V30 BEGIN BOND");
        for (position, (_, bond)) in structure.bonds_iter().enumerate() {
            let ends = numbered(&atom_numbers, &[bond.begin, bond.end], "atom")?;
            let mut details = format!(
                "{} {} {} {}",
                position + 1,
                bond.bond_type.code(),
                ends[0],
                ends[1]
            );
            if bond.topology.code() != 0 {
                details.push_str(&format!(" TOPO={}", bond.topology.code()));
            }
            if bond.reacting_center != 0 {
                details.push_str(&format!(" RXCTR={}", bond.reacting_center));
            }
            if bond.stereo.v3000_cfg() != 0 {
                details.push_str(&format!(" CFG={}", bond.stereo.v3000_cfg()));
            }
            buf.v30(&details);
        }
        buf.line("M  V30 END BOND");
    }

    write_collection3000(buf, structure.enhanced_stereo(), &atom_numbers)?;
    write_sgroups3000(buf, structure, &atom_numbers)?;
    buf.line("M  V30 END CTAB");
    Ok(())
}
