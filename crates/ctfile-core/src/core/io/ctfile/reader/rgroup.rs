use super::LineCursor;
use super::ctab2000::read_ctab2000;
use super::ctab3000::read_ctab3000;
use crate::core::io::ctfile::primitives::parse_int_token;
use crate::core::io::ctfile::v3000::Record;
use crate::core::io::error::{MolfileError, ParseErrorKind};
use crate::core::models::rgroup::RGroup;
use crate::core::models::structure::Structure;
use tracing::debug;

/// An R-group as read from a file: its logic plus the alternative fragments,
/// each still a standalone table.
#[derive(Debug, Default)]
pub(super) struct RGroupBlock {
    pub number: u32,
    pub logic: RGroup,
    pub fragments: Vec<Structure>,
}

impl RGroupBlock {
    /// Merges the fragments into `structure`, one fragment id per table,
    /// and registers them under the R-group number.
    pub fn attach_to(self, structure: &mut Structure) {
        let mut fragment_ids = Vec::with_capacity(self.fragments.len());
        for table in &self.fragments {
            let fragment = structure.new_fragment();
            for (_, id) in structure.merge(table) {
                if let Some(atom) = structure.atom_mut(id) {
                    atom.fragment = Some(fragment);
                }
            }
            fragment_ids.push(fragment);
        }
        let rgroup = structure.rgroup_entry(self.number);
        rgroup.if_then = self.logic.if_then;
        rgroup.rest_h = self.logic.rest_h;
        rgroup.range = self.logic.range;
        rgroup.fragments.extend(fragment_ids);
    }
}

/// Reads one V3000 `RGROUP` block; `BEGIN RGROUP n` has been consumed.
pub(super) fn read_rgroup3000(cursor: &mut LineCursor, number: u32) -> Result<RGroupBlock, MolfileError> {
    let mut block = RGroupBlock {
        number,
        ..RGroupBlock::default()
    };
    loop {
        if cursor.is_at_end() {
            return Err(cursor.error(ParseErrorKind::UnbalancedBlock("RGROUP".to_string())));
        }
        let body = cursor.next_v30()?;
        let line = cursor.line_no();
        match body.as_str() {
            "END RGROUP" => break,
            "BEGIN CTAB" => block.fragments.push(read_ctab3000(cursor)?),
            other if other.starts_with("RLOGIC") => {
                let record = Record::parse(other).map_err(|kind| MolfileError::parse(line, kind))?;
                if let Some(if_then) = record.positional(1) {
                    block.logic.if_then = parse_int_token(if_then, "IFTHEN", line)?.max(0) as u32;
                }
                if let Some(rest_h) = record.positional(2) {
                    block.logic.rest_h = parse_int_token(rest_h, "RESTH", line)? != 0;
                }
                block.logic.range = record.positional(3).unwrap_or_default().to_string();
            }
            other => debug!("Skipping record '{}' in R-group {} on line {}", other, number, line),
        }
    }
    Ok(block)
}

/// Reads a V2000 R-group file (`$MDL` ... `$END MOL`).
pub(super) fn read_rgfile2000(cursor: &mut LineCursor) -> Result<Structure, MolfileError> {
    let first = cursor.next_line("$MDL")?;
    if !first.starts_with("$MDL") {
        return Err(cursor.error(ParseErrorKind::UnexpectedToken {
            expected: "$MDL".to_string(),
            found: first.to_string(),
        }));
    }
    cursor.expect("$MOL")?;
    cursor.expect("$HDR")?;
    let name = cursor.next_line("molfile name")?.trim_end().to_string();
    cursor.next_line("molfile program line")?;
    cursor.next_line("molfile comment line")?;
    cursor.expect("$END HDR")?;

    cursor.expect("$CTAB")?;
    let scaffold = read_ctab2000(cursor)?;
    cursor.expect("$END CTAB")?;

    let mut structure = scaffold.structure;
    structure.name = name;
    let mut blocks: Vec<RGroupBlock> = scaffold
        .logic
        .into_iter()
        .map(|(number, logic)| RGroupBlock {
            number,
            logic,
            fragments: Vec::new(),
        })
        .collect();

    loop {
        let line = cursor.next_line("$END MOL")?;
        match line.trim() {
            "$END MOL" => break,
            "$RGP" => {
                let number_line = cursor.next_line("R-group number")?;
                let number =
                    parse_int_token(number_line.trim(), "R-group number", cursor.line_no())?.max(0) as u32;
                let mut fragments = Vec::new();
                loop {
                    let line = cursor.next_line("$END RGP")?;
                    match line.trim() {
                        "$END RGP" => break,
                        "$CTAB" => {
                            fragments.push(read_ctab2000(cursor)?.structure);
                            cursor.expect("$END CTAB")?;
                        }
                        other => {
                            return Err(cursor.error(ParseErrorKind::UnexpectedToken {
                                expected: "$CTAB or $END RGP".to_string(),
                                found: other.to_string(),
                            }));
                        }
                    }
                }
                match blocks.iter_mut().find(|block| block.number == number) {
                    Some(block) => block.fragments.extend(fragments),
                    None => blocks.push(RGroupBlock {
                        number,
                        logic: RGroup::new(),
                        fragments,
                    }),
                }
            }
            "" => {}
            other => {
                return Err(cursor.error(ParseErrorKind::UnexpectedToken {
                    expected: "$RGP or $END MOL".to_string(),
                    found: other.to_string(),
                }));
            }
        }
    }

    for block in blocks {
        block.attach_to(&mut structure);
    }
    Ok(structure)
}
