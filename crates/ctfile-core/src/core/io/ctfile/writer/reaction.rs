use super::ctab3000::write_ctab3000;
use super::{Header, write_molfile2000};
use crate::core::io::ctfile::primitives::{LineBuffer, padded_number};
use crate::core::io::error::MolfileError;
use crate::core::models::structure::Structure;

/// Writes a V2000 `$RXN` file: the counts line followed by a complete
/// molfile per component, reactants first.
pub(super) fn write_reaction2000(
    buf: &mut LineBuffer,
    structure: &Structure,
    header: &Header,
) -> Result<(), MolfileError> {
    let components = structure.reaction_components();
    buf.line("$RXN");
    buf.line(&structure.name);
    buf.blank();
    buf.blank();
    buf.line(&format!(
        "{}{}  0",
        padded_number(components.reactants.len() as i64, 3, "reactant count")?,
        padded_number(components.products.len() as i64, 3, "product count")?,
    ));
    for component in components.all() {
        buf.line("$MOL");
        write_molfile2000(buf, &structure.extract(component), header)?;
    }
    Ok(())
}

/// Writes a V3000 `$RXN V3000` file with reactant and product blocks.
pub(super) fn write_reaction3000(
    buf: &mut LineBuffer,
    structure: &Structure,
    header: &Header,
) -> Result<(), MolfileError> {
    let components = structure.reaction_components();
    buf.line("$RXN V3000");
    buf.line(&structure.name);
    buf.line(&format!("      {}", header.program()));
    buf.blank();
    buf.line(&format!(
        "M  V30 COUNTS {} {}",
        components.reactants.len(),
        components.products.len()
    ));
    for (block, pile) in [
        ("REACTANT", &components.reactants),
        ("PRODUCT", &components.products),
    ] {
        if pile.is_empty() {
            continue;
        }
        buf.line(&format!("M  V30 BEGIN {block}"));
        for component in pile {
            write_ctab3000(buf, &structure.extract(component))?;
        }
        buf.line(&format!("M  V30 END {block}"));
    }
    buf.line("M  END");
    Ok(())
}
