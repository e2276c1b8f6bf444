use super::ids::AtomId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bond type, using the CTfile numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondType {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
    SingleOrDouble,
    SingleOrAromatic,
    DoubleOrAromatic,
    Any,
    Dative,
    Hydrogen,
}

impl BondType {
    pub fn code(self) -> i64 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
            Self::Aromatic => 4,
            Self::SingleOrDouble => 5,
            Self::SingleOrAromatic => 6,
            Self::DoubleOrAromatic => 7,
            Self::Any => 8,
            Self::Dative => 9,
            Self::Hydrogen => 10,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::Aromatic),
            5 => Some(Self::SingleOrDouble),
            6 => Some(Self::SingleOrAromatic),
            7 => Some(Self::DoubleOrAromatic),
            8 => Some(Self::Any),
            9 => Some(Self::Dative),
            10 => Some(Self::Hydrogen),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid bond type string")]
pub struct ParseBondTypeError;

impl FromStr for BondType {
    type Err = ParseBondTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "4" | "ar" | "aromatic" => Ok(Self::Aromatic),
            "8" | "any" => Ok(Self::Any),
            _ => Err(ParseBondTypeError),
        }
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
                Self::SingleOrDouble => "Single or Double",
                Self::SingleOrAromatic => "Single or Aromatic",
                Self::DoubleOrAromatic => "Double or Aromatic",
                Self::Any => "Any",
                Self::Dative => "Dative",
                Self::Hydrogen => "Hydrogen",
            }
        )
    }
}

/// Wedge/hash display stereo of a bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondStereo {
    #[default]
    None,
    Up,
    Either,
    Down,
    CisTrans,
}

impl BondStereo {
    pub fn v2000_code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Up => 1,
            Self::CisTrans => 3,
            Self::Either => 4,
            Self::Down => 6,
        }
    }

    pub fn from_v2000_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Up),
            3 => Some(Self::CisTrans),
            4 => Some(Self::Either),
            6 => Some(Self::Down),
            _ => None,
        }
    }

    /// V3000 `CFG=` value. Cis/trans has no V3000 configuration and maps to 0.
    pub fn v3000_cfg(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Either => 2,
            Self::Down => 3,
            Self::None | Self::CisTrans => 0,
        }
    }

    pub fn from_v3000_cfg(cfg: i64) -> Option<Self> {
        match cfg {
            0 => Some(Self::None),
            1 => Some(Self::Up),
            2 => Some(Self::Either),
            3 => Some(Self::Down),
            _ => None,
        }
    }
}

/// Query topology constraint of a bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondTopology {
    #[default]
    Either,
    Ring,
    Chain,
}

impl BondTopology {
    pub fn code(self) -> i64 {
        match self {
            Self::Either => 0,
            Self::Ring => 1,
            Self::Chain => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Either),
            1 => Some(Self::Ring),
            2 => Some(Self::Chain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bond {
    pub begin: AtomId,            // Start atom (direction matters for wedge display only)
    pub end: AtomId,              // End atom
    pub bond_type: BondType,      // Bond order or query type
    pub stereo: BondStereo,       // Wedge/hash display stereo
    pub topology: BondTopology,   // Ring/chain query constraint
    pub reacting_center: i32,     // Reacting-center status bit field
    pub display: String,          // Opaque 3-character display field (V2000 `xxx`)
}

impl Bond {
    pub fn new(begin: AtomId, end: AtomId, bond_type: BondType) -> Self {
        Self {
            begin,
            end,
            bond_type,
            stereo: BondStereo::None,
            topology: BondTopology::Either,
            reacting_center: 0,
            display: String::new(),
        }
    }

    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.begin == atom_id || self.end == atom_id
    }

    /// Returns the endpoint opposite to `atom_id`, if `atom_id` is an endpoint.
    pub fn other(&self, atom_id: AtomId) -> Option<AtomId> {
        if self.begin == atom_id {
            Some(self.end)
        } else if self.end == atom_id {
            Some(self.begin)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_atom_id(n: u64) -> AtomId {
        AtomId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn bond_type_codes_round_trip() {
        for code in 1..=10 {
            let bond_type = BondType::from_code(code).unwrap();
            assert_eq!(bond_type.code(), code);
        }
        assert_eq!(BondType::from_code(0), None);
        assert_eq!(BondType::from_code(11), None);
    }

    #[test]
    fn bond_type_from_str_parses_valid_strings() {
        assert_eq!("1".parse::<BondType>().unwrap(), BondType::Single);
        assert_eq!("D".parse::<BondType>().unwrap(), BondType::Double);
        assert_eq!("triple".parse::<BondType>().unwrap(), BondType::Triple);
        assert_eq!("ar".parse::<BondType>().unwrap(), BondType::Aromatic);
        assert!("quadruple".parse::<BondType>().is_err());
    }

    #[test]
    fn bond_stereo_maps_to_v3000_configuration() {
        assert_eq!(BondStereo::Up.v3000_cfg(), 1);
        assert_eq!(BondStereo::Either.v3000_cfg(), 2);
        assert_eq!(BondStereo::Down.v3000_cfg(), 3);
        assert_eq!(BondStereo::None.v3000_cfg(), 0);
        assert_eq!(BondStereo::CisTrans.v3000_cfg(), 0);
        assert_eq!(BondStereo::from_v3000_cfg(3), Some(BondStereo::Down));
    }

    #[test]
    fn bond_stereo_v2000_codes_round_trip() {
        for stereo in [
            BondStereo::None,
            BondStereo::Up,
            BondStereo::Either,
            BondStereo::Down,
            BondStereo::CisTrans,
        ] {
            assert_eq!(BondStereo::from_v2000_code(stereo.v2000_code()), Some(stereo));
        }
        assert_eq!(BondStereo::from_v2000_code(2), None);
    }

    #[test]
    fn bond_other_returns_opposite_endpoint() {
        let a1 = dummy_atom_id(1);
        let a2 = dummy_atom_id(2);
        let unrelated = dummy_atom_id(3);
        let bond = Bond::new(a1, a2, BondType::Double);
        assert!(bond.contains(a1));
        assert!(bond.contains(a2));
        assert_eq!(bond.other(a1), Some(a2));
        assert_eq!(bond.other(a2), Some(a1));
        assert_eq!(bond.other(unrelated), None);
        assert_eq!(bond.display, "");
    }
}
