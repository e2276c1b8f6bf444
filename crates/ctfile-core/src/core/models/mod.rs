//! # Core Models Module
//!
//! In-memory representation of chemical structures as exchanged through
//! CTfiles.
//!
//! ## Key Components
//!
//! - [`atom`] - Atoms with every per-atom field a CTfile can carry
//! - [`topology`] - Bonds, bond types and bond stereo
//! - [`sgroup`] - Substructure groups and their kind-specific data
//! - [`rgroup`] - R-group logic and fragment alternatives
//! - [`stereo`] - Enhanced stereo collections
//! - [`reaction`] - Reaction arrows, pluses and component piles
//! - [`structure`] - The owning [`structure::Structure`] arena and its graph operations
//! - [`builder`] - Construction from 1-based file indices
//! - [`ids`] - Opaque keys for atoms, bonds, S-groups and fragments
//!
//! ## Usage
//!
//! ```ignore
//! use ctfile::core::models::{atom::Atom, structure::Structure, topology::{Bond, BondType}};
//!
//! let mut structure = Structure::new();
//! let c = structure.add_atom(Atom::new("C", Point3::origin()));
//! let o = structure.add_atom(Atom::new("O", Point3::new(1.2, 0.0, 0.0)));
//! structure.add_bond(Bond::new(c, o, BondType::Double));
//! ```

pub mod atom;
pub mod builder;
pub mod ids;
pub mod reaction;
pub mod rgroup;
pub mod sgroup;
pub mod stereo;
pub mod structure;
pub mod topology;
