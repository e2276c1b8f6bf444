use super::ids::{AtomId, BondId, SGroupId};
use nalgebra::Point2;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the repeating units of a polymer S-group connect to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Connectivity {
    #[default]
    HeadToTail,
    HeadToHead,
    Either,
}

impl Connectivity {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::HeadToTail => "HT",
            Self::HeadToHead => "HH",
            Self::Either => "EU",
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid S-group connectivity keyword")]
pub struct ParseConnectivityError;

impl FromStr for Connectivity {
    type Err = ParseConnectivityError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ht" => Ok(Self::HeadToTail),
            "hh" => Ok(Self::HeadToHead),
            "eu" => Ok(Self::Either),
            _ => Err(ParseConnectivityError),
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Display flags of a data S-group field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDisplay {
    /// Attached (`A`) or detached (`D`) display.
    pub attached: bool,
    /// Absolute (`A`) or relative (`R`) placement.
    pub absolute: bool,
    pub show_units: bool,
    /// Number of characters to display; `None` displays everything.
    pub chars_to_display: Option<u32>,
    pub tag: Option<char>,
    /// DASP position, 1 through 9.
    pub dasp_position: u8,
}

impl Default for DataDisplay {
    fn default() -> Self {
        Self {
            attached: false,
            absolute: true,
            show_units: false,
            chars_to_display: None,
            tag: None,
            dasp_position: 1,
        }
    }
}

/// Payload of a data (`DAT`) S-group.
#[derive(Debug, Clone, PartialEq)]
pub struct DataField {
    pub field_name: String,
    /// Field type code, `F` (formatted) when unspecified.
    pub field_type: String,
    pub field_value: String,
    pub units: String,
    pub query: String,
    pub query_op: String,
    pub display: DataDisplay,
    /// Where the field text is drawn, in the in-memory frame.
    pub position: Option<Point2<f64>>,
}

impl Default for DataField {
    fn default() -> Self {
        Self {
            field_name: String::new(),
            field_type: "F".to_string(),
            field_value: String::new(),
            units: String::new(),
            query: String::new(),
            query_op: String::new(),
            display: DataDisplay::default(),
            position: None,
        }
    }
}

impl DataField {
    /// Internal editor descriptors follow the `INDIGO_<name>_DESC` naming
    /// pattern (case-insensitive) and are normally stripped on save.
    pub fn is_internal_descriptor(&self) -> bool {
        let name = self.field_name.to_ascii_uppercase();
        name.len() > "INDIGO__DESC".len()
            && name.starts_with("INDIGO_")
            && name.ends_with("_DESC")
    }
}

/// The closed set of S-group kinds together with their kind-specific data.
#[derive(Debug, Clone, PartialEq)]
pub enum SGroupKind {
    /// `GEN`: a plain bracketed group.
    Generic,
    /// `DAT`: a named data field attached to atoms.
    Data(DataField),
    /// `SRU`: a structural repeat unit.
    RepeatUnit {
        subscript: String,
        connectivity: Connectivity,
    },
    /// `SUP`: an abbreviation (superatom).
    Superatom { name: String },
    /// `MUL`: a multiple group.
    Multiple { multiplier: u32 },
}

impl SGroupKind {
    /// The three-letter CTfile type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Generic => "GEN",
            Self::Data(_) => "DAT",
            Self::RepeatUnit { .. } => "SRU",
            Self::Superatom { .. } => "SUP",
            Self::Multiple { .. } => "MUL",
        }
    }

    /// Creates a kind with default payload for the given type tag.
    ///
    /// Returns `None` for tags outside the supported set.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "GEN" => Some(Self::Generic),
            "DAT" => Some(Self::Data(DataField::default())),
            "SRU" => Some(Self::RepeatUnit {
                subscript: "n".to_string(),
                connectivity: Connectivity::default(),
            }),
            "SUP" => Some(Self::Superatom {
                name: String::new(),
            }),
            "MUL" => Some(Self::Multiple { multiplier: 1 }),
            _ => None,
        }
    }
}

/// Axis-aligned display box spanned by an S-group's brackets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketBox {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl BracketBox {
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Grows the box to include `point`.
    pub fn include(&mut self, point: Point2<f64>) {
        self.min = Point2::new(self.min.x.min(point.x), self.min.y.min(point.y));
        self.max = Point2::new(self.max.x.max(point.x), self.max.y.max(point.y));
    }
}

/// A substructure group annotation over a subset of atoms.
///
/// Groups form a forest through [`SGroup::parent`]; the structure owning the
/// groups computes breadth-first order on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct SGroup {
    pub kind: SGroupKind,
    /// Member atoms, in authoring order.
    pub atoms: Vec<AtomId>,
    /// Bonds crossing the group boundary.
    pub crossing_bonds: Vec<BondId>,
    /// Paradigmatic (representative) atoms of a multiple group.
    pub patoms: Option<Vec<AtomId>>,
    pub parent: Option<SGroupId>,
    pub bracket_box: Option<BracketBox>,
}

impl SGroup {
    pub fn new(kind: SGroupKind, atoms: Vec<AtomId>) -> Self {
        Self {
            kind,
            atoms,
            crossing_bonds: Vec::new(),
            patoms: None,
            parent: None,
            bracket_box: None,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn data(&self) -> Option<&DataField> {
        match &self.kind {
            SGroupKind::Data(field) => Some(field),
            _ => None,
        }
    }

    pub fn data_mut(&mut self) -> Option<&mut DataField> {
        match &mut self.kind {
            SGroupKind::Data(field) => Some(field),
            _ => None,
        }
    }
}
