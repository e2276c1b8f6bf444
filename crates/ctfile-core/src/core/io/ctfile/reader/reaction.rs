use super::ctab3000::read_ctab3000;
use super::{LineCursor, read_molfile};
use crate::core::io::ctfile::primitives::parse_int_field;
use crate::core::io::error::{MolfileError, ParseErrorKind};
use crate::core::models::ids::AtomId;
use crate::core::models::reaction::{RxnArrow, RxnPlus};
use crate::core::models::structure::Structure;
use nalgebra::{Point2, Vector3};
use tracing::debug;

/// Minimum horizontal clearance between a component and its neighbor or
/// the arrow.
const GAP: f64 = 2.0;

fn read_rxn_header<'a>(cursor: &mut LineCursor<'a>) -> Result<&'a str, MolfileError> {
    let first = cursor.next_line("$RXN")?;
    if !first.starts_with("$RXN") {
        return Err(cursor.error(ParseErrorKind::UnexpectedToken {
            expected: "$RXN".to_string(),
            found: first.to_string(),
        }));
    }
    let name = cursor.next_line("reaction name")?.trim_end();
    cursor.next_line("reaction program line")?;
    cursor.next_line("reaction comment line")?;
    Ok(name)
}

/// Reads a V2000 `$RXN` file.
pub(super) fn read_reaction2000(cursor: &mut LineCursor) -> Result<Structure, MolfileError> {
    let name = read_rxn_header(cursor)?;
    let counts = cursor.next_line("reaction counts line")?;
    let line = cursor.line_no();
    let reactant_count = parse_int_field(counts, 0, 3, line)?.max(0) as usize;
    let product_count = parse_int_field(counts, 3, 6, line)?.max(0) as usize;

    let mut components = Vec::with_capacity(reactant_count + product_count);
    for _ in 0..reactant_count + product_count {
        cursor.expect("$MOL")?;
        components.push(read_molfile(cursor)?);
    }
    let products = components.split_off(reactant_count);
    Ok(assemble(name, &components, &products))
}

fn read_pile3000(cursor: &mut LineCursor, block: &str) -> Result<Vec<Structure>, MolfileError> {
    let terminator = format!("END {block}");
    let mut tables = Vec::new();
    loop {
        if cursor.is_at_end() {
            return Err(cursor.error(ParseErrorKind::UnbalancedBlock(block.to_string())));
        }
        let body = cursor.next_v30()?;
        if body == terminator {
            return Ok(tables);
        }
        if body == "BEGIN CTAB" {
            tables.push(read_ctab3000(cursor)?);
        } else {
            debug!("Skipping record '{}' in {} block", body, block);
        }
    }
}

/// Reads a `$RXN V3000` file.
pub(super) fn read_reaction3000(cursor: &mut LineCursor) -> Result<Structure, MolfileError> {
    let name = read_rxn_header(cursor)?;
    let mut reactants = Vec::new();
    let mut products = Vec::new();

    loop {
        let Some(next) = cursor.peek() else {
            return Err(cursor.error(ParseErrorKind::MissingRecord("M  END".to_string())));
        };
        if next.trim_end() == "M  END" {
            cursor.next_line("M  END")?;
            break;
        }
        let body = cursor.next_v30()?;
        match body.as_str() {
            "BEGIN REACTANT" => reactants.extend(read_pile3000(cursor, "REACTANT")?),
            "BEGIN PRODUCT" => products.extend(read_pile3000(cursor, "PRODUCT")?),
            other => match other.strip_prefix("BEGIN ") {
                Some(block) => cursor.skip_block(block)?,
                None => debug!("Skipping reaction record '{}'", other),
            },
        }
    }
    Ok(assemble(name, &reactants, &products))
}

fn merge_pile(structure: &mut Structure, tables: &[Structure]) -> Vec<Vec<AtomId>> {
    tables
        .iter()
        .map(|table| {
            let map = structure.merge(table);
            table
                .atom_ids()
                .iter()
                .filter_map(|id| map.get(id).copied())
                .collect::<Vec<_>>()
        })
        .filter(|component| !component.is_empty())
        .collect()
}

/// Shifts components right until consecutive ones no longer overlap.
fn spread(structure: &mut Structure, pile: &[Vec<AtomId>]) {
    let mut right_edge: Option<f64> = None;
    for component in pile {
        let Some((min, max)) = structure.bounding_box(component) else {
            continue;
        };
        let shift = match right_edge {
            Some(edge) if min.x < edge + GAP => edge + GAP - min.x,
            _ => 0.0,
        };
        if shift > 0.0 {
            structure.translate_atoms(component, Vector3::new(shift, 0.0, 0.0));
        }
        right_edge = Some(max.x + shift);
    }
}

fn pile_box(structure: &Structure, pile: &[Vec<AtomId>]) -> Option<(Point2<f64>, Point2<f64>)> {
    structure.bounding_box(&pile.concat())
}

fn center_y((min, max): (Point2<f64>, Point2<f64>)) -> f64 {
    (min.y + max.y) / 2.0
}

fn add_pluses(structure: &mut Structure, pile: &[Vec<AtomId>]) {
    for pair in pile.windows(2) {
        let (Some(left), Some(right)) = (
            structure.bounding_box(&pair[0]),
            structure.bounding_box(&pair[1]),
        ) else {
            continue;
        };
        let position = Point2::new(
            (left.1.x + right.0.x) / 2.0,
            (center_y(left) + center_y(right)) / 2.0,
        );
        structure.add_plus(RxnPlus::new(position));
    }
}

/// Merges the components into one structure and places the reaction
/// graphics: pluses between consecutive components of a pile and the arrow
/// between the piles.
///
/// Products that overlap the reactants horizontally are moved right, so
/// splitting the result at the arrow recovers the same piles.
fn assemble(name: &str, reactants: &[Structure], products: &[Structure]) -> Structure {
    let mut structure = Structure::new();
    structure.name = name.to_string();
    let reactant_pile = merge_pile(&mut structure, reactants);
    let product_pile = merge_pile(&mut structure, products);
    spread(&mut structure, &reactant_pile);
    spread(&mut structure, &product_pile);

    let reactant_box = pile_box(&structure, &reactant_pile);
    if let (Some((_, r_max)), Some((p_min, _))) = (reactant_box, pile_box(&structure, &product_pile)) {
        let required = r_max.x + 2.0 * GAP;
        if p_min.x < required {
            let atoms = product_pile.concat();
            structure.translate_atoms(&atoms, Vector3::new(required - p_min.x, 0.0, 0.0));
        }
    }
    let product_box = pile_box(&structure, &product_pile);

    let arrow = match (reactant_box, product_box) {
        (Some(r), Some(p)) => Point2::new((r.1.x + p.0.x) / 2.0, (center_y(r) + center_y(p)) / 2.0),
        (Some(r), None) => Point2::new(r.1.x + GAP, center_y(r)),
        (None, Some(p)) => Point2::new(p.0.x - GAP, center_y(p)),
        (None, None) => Point2::origin(),
    };
    structure.add_arrow(RxnArrow::new(arrow));
    add_pluses(&mut structure, &reactant_pile);
    add_pluses(&mut structure, &product_pile);
    structure
}
