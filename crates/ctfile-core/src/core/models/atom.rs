use super::ids::FragmentId;
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label used for R-group attachment sites.
pub const RGROUP_LABEL: &str = "R#";
/// Label used for atoms carrying an enumerated element list.
pub const ATOM_LIST_LABEL: &str = "L";
/// Highest R-group number an atom's membership mask can hold.
pub const MAX_RGROUP: u32 = 32;

/// Radical state of an atom, using the CTfile numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Radical {
    #[default]
    None,
    Singlet,
    Doublet,
    Triplet,
}

impl Radical {
    pub fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Singlet => 1,
            Self::Doublet => 2,
            Self::Triplet => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Singlet),
            2 => Some(Self::Doublet),
            3 => Some(Self::Triplet),
            _ => None,
        }
    }
}

/// Which side(s) of an R-group fragment an atom attaches through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentPoint {
    Primary,
    Secondary,
    Both,
}

impl AttachmentPoint {
    /// Code used by the V2000 `M  APO` property list.
    pub fn v2000_code(self) -> i64 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Both => 3,
        }
    }

    pub fn from_v2000_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Primary),
            2 => Some(Self::Secondary),
            3 => Some(Self::Both),
            _ => None,
        }
    }

    /// Code used by the V3000 `ATTCHPT=` atom property.
    pub fn v3000_code(self) -> i64 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Both => -1,
        }
    }

    pub fn from_v3000_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Primary),
            2 => Some(Self::Secondary),
            -1 | 3 => Some(Self::Both),
            _ => None,
        }
    }
}

/// An enumerated set of allowed element labels for a query atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomList {
    /// Element labels, in authoring order.
    pub labels: Vec<String>,
    /// `true` when the atom may be anything *except* the listed elements.
    pub negated: bool,
}

impl AtomList {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>, negated: bool) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            negated,
        }
    }
}

impl fmt::Display for AtomList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "NOT ")?;
        }
        write!(f, "[{}]", self.labels.join(","))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid atom list notation: '{0}'")]
pub struct ParseAtomListError(pub String);

impl FromStr for AtomList {
    type Err = ParseAtomListError;

    /// Parses the V3000 bracket notation, e.g. `[C,N,O]` or `NOT [F,Cl]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negated, rest) = match trimmed.strip_prefix("NOT") {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let inner = rest
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(|| ParseAtomListError(s.to_string()))?;
        let labels: Vec<String> = inner
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if labels.is_empty() {
            return Err(ParseAtomListError(s.to_string()));
        }
        Ok(Self { labels, negated })
    }
}

/// An atom of a chemical structure, with every per-atom field the CTfile
/// format can carry.
///
/// Fields left at their defaults are omitted from V3000 output and written
/// as zeros in V2000 output.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Element symbol or generic/query token (`A`, `Q`, `X`, `*`, `R#`, `L`).
    pub label: String,
    /// Position in the in-memory frame (Y grows downwards relative to the file).
    pub position: Point3<f64>,
    /// Display alias shown instead of the label.
    pub alias: Option<String>,
    /// Free-text pseudo-atom label.
    pub pseudo: Option<String>,
    /// Allowed (or forbidden) element list for query atoms.
    pub atom_list: Option<AtomList>,
    pub charge: i32,
    /// Absolute isotope mass number, 0 when unset.
    pub isotope: i32,
    pub radical: Radical,
    /// `None` means "no explicit valence"; `Some(0)` is an explicit zero.
    pub explicit_valence: Option<u8>,
    pub hydrogen_count: i32,
    pub stereo_care: i32,
    /// Atom-atom mapping number used in reactions.
    pub aam: u32,
    /// Inversion/retention flag.
    pub inversion: i32,
    pub exact_change: i32,
    pub substitution_count: i32,
    pub unsaturated: i32,
    pub ring_bond_count: i32,
    pub attachment_point: Option<AttachmentPoint>,
    /// Bit `n` set means membership in R-group `n + 1`.
    pub rgroup_mask: u32,
    /// Fragment this atom belongs to, assigned by fragment marking.
    pub fragment: Option<FragmentId>,
}

impl Atom {
    /// Creates an atom with the given label and position and every optional
    /// field left unset.
    pub fn new(label: &str, position: Point3<f64>) -> Self {
        Self {
            label: label.to_string(),
            position,
            alias: None,
            pseudo: None,
            atom_list: None,
            charge: 0,
            isotope: 0,
            radical: Radical::None,
            explicit_valence: None,
            hydrogen_count: 0,
            stereo_care: 0,
            aam: 0,
            inversion: 0,
            exact_change: 0,
            substitution_count: 0,
            unsaturated: 0,
            ring_bond_count: 0,
            attachment_point: None,
            rgroup_mask: 0,
            fragment: None,
        }
    }

    pub fn is_rgroup_site(&self) -> bool {
        self.label == RGROUP_LABEL
    }

    /// Returns the 1-based R-group numbers encoded in [`Atom::rgroup_mask`].
    pub fn rgroup_ids(&self) -> Vec<u32> {
        (0..MAX_RGROUP)
            .filter(|bit| self.rgroup_mask & (1 << bit) != 0)
            .map(|bit| bit + 1)
            .collect()
    }

    /// Marks membership in the 1-based R-group `rgroup`.
    ///
    /// Returns `false` and leaves the mask unchanged for numbers outside
    /// `1..=32`; the mask has 32 slots.
    pub fn add_rgroup(&mut self, rgroup: u32) -> bool {
        if !(1..=MAX_RGROUP).contains(&rgroup) {
            return false;
        }
        self.rgroup_mask |= 1 << (rgroup - 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let atom = Atom::new("C", Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.label, "C");
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.charge, 0);
        assert_eq!(atom.radical, Radical::None);
        assert_eq!(atom.explicit_valence, None);
        assert!(atom.attachment_point.is_none());
        assert_eq!(atom.rgroup_mask, 0);
        assert!(atom.fragment.is_none());
    }

    #[test]
    fn rgroup_mask_round_trips_through_ids() {
        let mut atom = Atom::new(RGROUP_LABEL, Point3::origin());
        atom.add_rgroup(1);
        atom.add_rgroup(3);
        assert!(atom.add_rgroup(32));
        assert!(!atom.add_rgroup(33));
        assert!(!atom.add_rgroup(0));
        assert_eq!(atom.rgroup_ids(), vec![1, 3, 32]);
        assert!(atom.is_rgroup_site());
    }

    #[test]
    fn atom_list_parses_plain_and_negated_notation() {
        let list: AtomList = "[C,N,O]".parse().unwrap();
        assert_eq!(list.labels, vec!["C", "N", "O"]);
        assert!(!list.negated);

        let list: AtomList = "NOT [F, Cl]".parse().unwrap();
        assert_eq!(list.labels, vec!["F", "Cl"]);
        assert!(list.negated);
        assert_eq!(list.to_string(), "NOT [F,Cl]");
    }

    #[test]
    fn atom_list_rejects_malformed_notation() {
        assert!("C,N".parse::<AtomList>().is_err());
        assert!("[]".parse::<AtomList>().is_err());
        assert!("NOT".parse::<AtomList>().is_err());
    }

    #[test]
    fn attachment_point_codes_differ_between_dialects() {
        assert_eq!(AttachmentPoint::Both.v2000_code(), 3);
        assert_eq!(AttachmentPoint::Both.v3000_code(), -1);
        assert_eq!(
            AttachmentPoint::from_v3000_code(-1),
            Some(AttachmentPoint::Both)
        );
        assert_eq!(AttachmentPoint::from_v2000_code(4), None);
    }

    #[test]
    fn radical_codes_round_trip() {
        for radical in [
            Radical::None,
            Radical::Singlet,
            Radical::Doublet,
            Radical::Triplet,
        ] {
            assert_eq!(Radical::from_code(radical.code()), Some(radical));
        }
        assert_eq!(Radical::from_code(7), None);
    }
}
