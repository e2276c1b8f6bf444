//! # ctfile
//!
//! A reader and writer for MDL CTfile documents: V2000 and V3000 molfiles,
//! `$RXN` reaction files and `$MDL` R-group files.
//!
//! ## Layout
//!
//! - **[`core`]: The Foundation.** The in-memory `Structure` model (atoms,
//!   bonds, S-groups, R-group fragments, reaction arrows and pluses, enhanced
//!   stereo) and the codec that encodes it to and decodes it from text.
//!
//! - **[`workflows`]: The Public API.** File-level entry points that read a
//!   document from disk, write one, or convert between dialects in one call.
//!
//! ## Example
//!
//! ```ignore
//! use ctfile::{SaveOptions, workflows};
//!
//! let structure = workflows::convert::read_path("aspirin.mol")?;
//! workflows::convert::write_path(&structure, &SaveOptions::v3000(), "aspirin_v3.mol")?;
//! ```

pub mod core;
pub mod workflows;

pub use crate::core::io::ctfile::{MolfileFormat, parse, serialize};
pub use crate::core::io::error::{MolfileError, ParseErrorKind, SGroupError};
pub use crate::core::io::options::{Dialect, SaveOptions};
pub use crate::core::io::traits::StructureFile;
pub use crate::core::models::structure::Structure;
