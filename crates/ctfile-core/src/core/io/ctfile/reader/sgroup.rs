use super::build_error;
use crate::core::io::ctfile::primitives::{
    parse_float_field, parse_float_token, parse_index, parse_int_token, slice_and_trim,
};
use crate::core::io::ctfile::v3000::{Record, parse_list};
use crate::core::io::error::{MolfileError, ParseErrorKind};
use crate::core::models::builder::StructureBuilder;
use crate::core::models::ids::{AtomId, BondId};
use crate::core::models::sgroup::{BracketBox, Connectivity, DataDisplay, SGroup, SGroupKind};
use crate::core::models::structure::Structure;
use nalgebra::Point2;
use std::collections::{BTreeMap, HashMap};

/// An S-group read from a file whose parent is still a sequence number.
#[derive(Debug)]
pub(super) struct PendingSGroup {
    pub sgroup: SGroup,
    pub parent: Option<usize>,
}

/// Adds groups in sequence order and links them to their parents.
pub(super) fn attach_sgroups(
    structure: &mut Structure,
    pending: BTreeMap<usize, PendingSGroup>,
) -> Result<(), MolfileError> {
    let mut ids = HashMap::new();
    let mut links = Vec::new();
    for (seq, entry) in pending {
        let id = structure.add_sgroup(entry.sgroup);
        ids.insert(seq, id);
        if let Some(parent) = entry.parent {
            links.push((seq, id, parent));
        }
    }
    for (seq, child, parent) in links {
        let linked = ids
            .get(&parent)
            .is_some_and(|&parent| structure.set_sgroup_parent(child, Some(parent)));
        if !linked {
            return Err(MolfileError::Malformed(format!(
                "S-group {seq} has an invalid parent {parent}"
            )));
        }
    }
    Ok(())
}

fn flag_at(record: &str, column: usize, set: char) -> bool {
    record.get(column..).and_then(|rest| rest.chars().next()) == Some(set)
}

/// Parses the 45-character data display record of `M  SDD` / `FIELDDISP=`.
pub(super) fn parse_display_record(
    record: &str,
    line: usize,
) -> Result<(Point2<f64>, DataDisplay), MolfileError> {
    let x = parse_float_field(record, 0, 10, line)?;
    let y = parse_float_field(record, 10, 20, line)?;
    let chars = slice_and_trim(record, 30, 33);
    let chars_to_display = match chars {
        "" | "ALL" => None,
        digits => Some(parse_int_token(digits, "characters to display", line)? as u32),
    };
    let tag = record
        .get(40..41)
        .and_then(|tag| tag.chars().next())
        .filter(|c| !c.is_whitespace());
    let dasp_position = match slice_and_trim(record, 42, 43) {
        "" => 1,
        digit => parse_int_token(digit, "DASP position", line)? as u8,
    };
    let display = DataDisplay {
        attached: flag_at(record, 24, 'A'),
        absolute: !flag_at(record, 25, 'R'),
        show_units: flag_at(record, 26, 'U'),
        chars_to_display,
        tag,
        dasp_position,
    };
    Ok((Point2::new(x, -y), display))
}

fn unknown_type(tag: &str, line: usize) -> MolfileError {
    MolfileError::parse(line, ParseErrorKind::UnknownSGroupType(tag.to_string()))
}

#[derive(Debug)]
struct Draft {
    kind: SGroupKind,
    atoms: Vec<usize>,
    bonds: Vec<usize>,
    patoms: Option<Vec<usize>>,
    parent: Option<usize>,
    bracket_box: Option<BracketBox>,
    value: String,
}

impl Draft {
    fn new(kind: SGroupKind) -> Self {
        Self {
            kind,
            atoms: Vec::new(),
            bonds: Vec::new(),
            patoms: None,
            parent: None,
            bracket_box: None,
            value: String::new(),
        }
    }

    fn include(&mut self, point: Point2<f64>) {
        match &mut self.bracket_box {
            Some(bbox) => bbox.include(point),
            None => self.bracket_box = Some(BracketBox::new(point, point)),
        }
    }
}

/// Accumulates the V2000 `M  S..` records of one connection table.
#[derive(Debug, Default)]
pub(super) struct SGroupRecords2000 {
    drafts: BTreeMap<usize, Draft>,
}

impl SGroupRecords2000 {
    pub fn handles(tag: &str) -> bool {
        matches!(
            tag,
            "STY" | "SLB" | "SST" | "SPL" | "SCN" | "SMT" | "SAL" | "SBL" | "SPA" | "SDT"
                | "SDD" | "SCD" | "SED" | "SDI"
        )
    }

    fn draft(&mut self, token: &str, line: usize) -> Result<&mut Draft, MolfileError> {
        let seq = parse_index(token, "S-group", line)?;
        self.drafts.get_mut(&seq).ok_or_else(|| {
            MolfileError::parse(
                line,
                ParseErrorKind::IndexOutOfRange {
                    what: "S-group",
                    index: seq,
                },
            )
        })
    }

    /// `M  XXX nn8 sss vvv ...` records listing (group, value) pairs.
    fn pairs<'a>(text: &'a str, line: usize) -> Result<Vec<(&'a str, &'a str)>, MolfileError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let count = match tokens.first() {
            Some(token) => parse_int_token(token, "entry count", line)?.max(0) as usize,
            None => 0,
        };
        Ok(tokens[1.min(tokens.len())..]
            .chunks(2)
            .filter(|pair| pair.len() == 2)
            .take(count)
            .map(|pair| (pair[0], pair[1]))
            .collect())
    }

    pub fn record(&mut self, tag: &str, text: &str, line: usize) -> Result<(), MolfileError> {
        match tag {
            "STY" => {
                for (seq, kind_tag) in Self::pairs(text, line)? {
                    let seq = parse_index(seq, "S-group", line)?;
                    let kind = SGroupKind::from_tag(kind_tag).ok_or_else(|| unknown_type(kind_tag, line))?;
                    self.drafts.insert(seq, Draft::new(kind));
                }
            }
            "SPL" => {
                for (seq, parent) in Self::pairs(text, line)? {
                    let parent = parse_index(parent, "S-group", line)?;
                    self.draft(seq, line)?.parent = Some(parent);
                }
            }
            "SCN" => {
                for (seq, keyword) in Self::pairs(text, line)? {
                    let parsed = keyword.parse::<Connectivity>().map_err(|_| {
                        MolfileError::parse(
                            line,
                            ParseErrorKind::UnexpectedToken {
                                expected: "HT, HH or EU".to_string(),
                                found: keyword.to_string(),
                            },
                        )
                    })?;
                    if let SGroupKind::RepeatUnit { connectivity, .. } = &mut self.draft(seq, line)?.kind {
                        *connectivity = parsed;
                    }
                }
            }
            "SAL" | "SBL" | "SPA" => {
                let mut tokens = text.split_whitespace();
                let seq = tokens.next().unwrap_or_default();
                let count = tokens
                    .next()
                    .map(|token| parse_int_token(token, "entry count", line))
                    .transpose()?
                    .unwrap_or(0)
                    .max(0) as usize;
                let indices = tokens
                    .take(count)
                    .map(|token| parse_index(token, "S-group member", line))
                    .collect::<Result<Vec<_>, _>>()?;
                let draft = self.draft(seq, line)?;
                match tag {
                    "SAL" => draft.atoms.extend(indices),
                    "SBL" => draft.bonds.extend(indices),
                    _ => draft.patoms.get_or_insert_with(Vec::new).extend(indices),
                }
            }
            "SMT" => {
                let seq = slice_and_trim(text, 0, 4);
                let value = text.get(4..).unwrap_or_default().trim();
                let draft = self.draft(seq, line)?;
                match &mut draft.kind {
                    SGroupKind::RepeatUnit { subscript, .. } => *subscript = value.to_string(),
                    SGroupKind::Superatom { name } => *name = value.to_string(),
                    SGroupKind::Multiple { multiplier } => {
                        *multiplier = parse_int_token(value, "multiplier", line)?.max(0) as u32;
                    }
                    _ => {}
                }
            }
            "SDT" => {
                let seq = slice_and_trim(text, 0, 4);
                let draft = self.draft(seq, line)?;
                if let SGroupKind::Data(field) = &mut draft.kind {
                    field.field_name = slice_and_trim(text, 5, 35).to_string();
                    let field_type = slice_and_trim(text, 35, 37);
                    field.field_type = if field_type.is_empty() { "F" } else { field_type }.to_string();
                    field.units = slice_and_trim(text, 37, 57).to_string();
                    field.query = slice_and_trim(text, 57, 59).to_string();
                    field.query_op = text.get(59..).unwrap_or_default().trim().to_string();
                }
            }
            "SDD" => {
                let seq = slice_and_trim(text, 0, 4);
                let record = text.get(5..).unwrap_or_default();
                let (position, display) = parse_display_record(record, line)?;
                if let SGroupKind::Data(field) = &mut self.draft(seq, line)?.kind {
                    field.position = Some(position);
                    field.display = display;
                }
            }
            "SCD" | "SED" => {
                let seq = slice_and_trim(text, 0, 4);
                let chunk = text.get(5..).unwrap_or_default();
                self.draft(seq, line)?.value.push_str(chunk);
            }
            "SDI" => {
                let seq = slice_and_trim(text, 0, 4);
                let mut coords = [0.0; 4];
                for (i, value) in coords.iter_mut().enumerate() {
                    *value = parse_float_field(text, 7 + 10 * i, 17 + 10 * i, line)?;
                }
                let draft = self.draft(seq, line)?;
                draft.include(Point2::new(coords[0], -coords[1]));
                draft.include(Point2::new(coords[2], -coords[3]));
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolves member indices against the atoms and bonds read so far.
    pub fn finish(
        self,
        builder: &StructureBuilder,
        line: usize,
    ) -> Result<BTreeMap<usize, PendingSGroup>, MolfileError> {
        let atom = |index: usize| builder.resolve_atom(index).map_err(|e| build_error(line, e));
        let mut pending = BTreeMap::new();
        for (seq, draft) in self.drafts {
            let atoms = draft.atoms.iter().map(|&i| atom(i)).collect::<Result<Vec<_>, _>>()?;
            let crossing_bonds = draft
                .bonds
                .iter()
                .map(|&index| {
                    builder.resolve_bond(index).ok_or_else(|| {
                        MolfileError::parse(
                            line,
                            ParseErrorKind::IndexOutOfRange { what: "bond", index },
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let patoms = draft
                .patoms
                .map(|patoms| patoms.iter().map(|&i| atom(i)).collect::<Result<Vec<_>, _>>())
                .transpose()?;

            let mut kind = draft.kind;
            if let SGroupKind::Data(field) = &mut kind {
                field.field_value = draft.value;
            }
            let mut sgroup = SGroup::new(kind, atoms);
            sgroup.crossing_bonds = crossing_bonds;
            sgroup.patoms = patoms;
            sgroup.bracket_box = draft.bracket_box;
            pending.insert(
                seq,
                PendingSGroup {
                    sgroup,
                    parent: draft.parent,
                },
            );
        }
        Ok(pending)
    }
}

/// Resolves a V3000 `(n i1 i2 ...)` index list through `map`.
pub(super) fn resolve_list<K: Copy>(
    value: &str,
    map: &HashMap<usize, K>,
    what: &'static str,
    line: usize,
) -> Result<Vec<K>, MolfileError> {
    parse_list(value)
        .map_err(|kind| MolfileError::parse(line, kind))?
        .iter()
        .map(|token| {
            let index = parse_index(token, what, line)?;
            map.get(&index)
                .copied()
                .ok_or_else(|| MolfileError::parse(line, ParseErrorKind::IndexOutOfRange { what, index }))
        })
        .collect()
}

/// Parses one record of a V3000 `SGROUP` block.
pub(super) fn parse_sgroup3000(
    record: &Record,
    atoms: &HashMap<usize, AtomId>,
    bonds: &HashMap<usize, BondId>,
    line: usize,
) -> Result<(usize, PendingSGroup), MolfileError> {
    let seq = parse_index(record.positional(0).unwrap_or_default(), "S-group", line)?;
    let tag = record.positional(1).unwrap_or_default();
    let mut kind = SGroupKind::from_tag(tag).ok_or_else(|| unknown_type(tag, line))?;

    let text = |key: &str| record.get(key).map(str::to_string);
    match &mut kind {
        SGroupKind::Data(field) => {
            field.field_name = text("FIELDNAME").unwrap_or_default();
            field.units = text("FIELDINFO").unwrap_or_default();
            field.query = text("QUERYTYPE").unwrap_or_default();
            field.query_op = text("QUERYOP").unwrap_or_default();
            field.field_value = text("FIELDDATA").unwrap_or_default();
            if let Some(display) = record.get("FIELDDISP") {
                let (position, display) = parse_display_record(display, line)?;
                field.position = Some(position);
                field.display = display;
            }
        }
        SGroupKind::RepeatUnit {
            subscript,
            connectivity,
        } => {
            if let Some(label) = text("LABEL") {
                *subscript = label;
            }
            if let Some(keyword) = record.get("CONNECT") {
                *connectivity = keyword.parse().map_err(|_| {
                    MolfileError::parse(
                        line,
                        ParseErrorKind::UnexpectedToken {
                            expected: "HT, HH or EU".to_string(),
                            found: keyword.to_string(),
                        },
                    )
                })?;
            }
        }
        SGroupKind::Superatom { name } => *name = text("LABEL").unwrap_or_default(),
        SGroupKind::Multiple { multiplier } => {
            if let Some(value) = record.get("MULT") {
                *multiplier = parse_int_token(value, "multiplier", line)?.max(0) as u32;
            }
        }
        SGroupKind::Generic => {}
    }

    let member_atoms = match record.get("ATOMS") {
        Some(list) => resolve_list(list, atoms, "atom", line)?,
        None => Vec::new(),
    };
    let mut sgroup = SGroup::new(kind, member_atoms);
    if let Some(list) = record.get("XBONDS") {
        sgroup.crossing_bonds = resolve_list(list, bonds, "bond", line)?;
    }
    if let Some(list) = record.get("PATOMS") {
        sgroup.patoms = Some(resolve_list(list, atoms, "atom", line)?);
    }
    for brackets in record.get_all("BRKXYZ") {
        let values = parse_list(brackets)
            .map_err(|kind| MolfileError::parse(line, kind))?
            .iter()
            .map(|token| parse_float_token(token, "bracket coordinate", line))
            .collect::<Result<Vec<_>, _>>()?;
        for point in values.chunks_exact(3).take(2) {
            let point = Point2::new(point[0], -point[1]);
            match &mut sgroup.bracket_box {
                Some(bbox) => bbox.include(point),
                None => sgroup.bracket_box = Some(BracketBox::new(point, point)),
            }
        }
    }
    let parent = record
        .get("PARENT")
        .map(|value| parse_index(value, "S-group", line))
        .transpose()?;
    Ok((seq, PendingSGroup { sgroup, parent }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    #[test]
    fn display_record_parses_flags_and_flips_y() {
        let record = "    1.5000   -2.0000    AAU   012001    * 3  ";
        let (position, display) = parse_display_record(record, 1).unwrap();
        assert_eq!(position, Point2::new(1.5, 2.0));
        assert!(display.attached && display.absolute && display.show_units);
        assert_eq!(display.chars_to_display, Some(12));
        assert_eq!(display.tag, Some('*'));
        assert_eq!(display.dasp_position, 3);

        let unlimited = "    0.0000    0.0000    DR    ALL001      1  ";
        let (_, display) = parse_display_record(unlimited, 1).unwrap();
        assert!(!display.attached && !display.absolute);
        assert_eq!(display.chars_to_display, None);
        assert_eq!(display.tag, None);
    }

    fn builder_with_atoms(n: usize) -> StructureBuilder {
        let mut builder = StructureBuilder::new();
        for i in 0..n {
            builder.push_atom(Atom::new("C", Point3::new(i as f64, 0.0, 0.0)));
        }
        builder
    }

    #[test]
    fn v2000_records_build_data_groups() {
        let mut records = SGroupRecords2000::default();
        records.record("STY", "  1   1 DAT", 1).unwrap();
        records
            .record("SAL", "   1  2   1   2", 2)
            .unwrap();
        records
            .record("SDT", &format!("   1 {:<30}N {:<20}", "pKa", "log units"), 3)
            .unwrap();
        records.record("SCD", "   1 first ", 4).unwrap();
        records.record("SED", "   1 second", 5).unwrap();

        let pending = records.finish(&builder_with_atoms(2), 6).unwrap();
        let group = &pending[&1].sgroup;
        assert_eq!(group.atoms.len(), 2);
        let field = group.data().unwrap();
        assert_eq!(field.field_name, "pKa");
        assert_eq!(field.field_type, "N");
        assert_eq!(field.units, "log units");
        assert_eq!(field.field_value, "first second");
    }

    #[test]
    fn v2000_unknown_type_is_rejected() {
        let mut records = SGroupRecords2000::default();
        assert!(matches!(
            records.record("STY", "  1   1 XYZ", 9),
            Err(MolfileError::Parse {
                line: 9,
                kind: ParseErrorKind::UnknownSGroupType(_)
            })
        ));
    }

    #[test]
    fn v2000_member_out_of_range_is_rejected() {
        let mut records = SGroupRecords2000::default();
        records.record("STY", "  1   1 GEN", 1).unwrap();
        records.record("SAL", "   1  1   5", 2).unwrap();
        assert!(records.finish(&builder_with_atoms(2), 3).is_err());
    }

    #[test]
    fn v3000_record_reads_multiple_group() {
        let mut structure = Structure::new();
        let atoms: HashMap<usize, AtomId> = (1..=4)
            .map(|i| (i, structure.add_atom(Atom::new("C", Point3::origin()))))
            .collect();
        let record = Record::parse("3 MUL 0 ATOMS=(4 1 2 3 4) PATOMS=(2 1 2) MULT=2 PARENT=1").unwrap();
        let (seq, pending) = parse_sgroup3000(&record, &atoms, &HashMap::new(), 1).unwrap();
        assert_eq!(seq, 3);
        assert_eq!(pending.parent, Some(1));
        assert_eq!(pending.sgroup.kind, SGroupKind::Multiple { multiplier: 2 });
        assert_eq!(pending.sgroup.patoms.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn attach_rejects_missing_parents() {
        let mut pending = BTreeMap::new();
        pending.insert(
            1,
            PendingSGroup {
                sgroup: SGroup::new(SGroupKind::Generic, Vec::new()),
                parent: Some(7),
            },
        );
        assert!(attach_sgroups(&mut Structure::new(), pending).is_err());
    }
}
