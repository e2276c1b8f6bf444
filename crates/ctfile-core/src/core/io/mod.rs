//! Reading and writing MDL CTfiles.
//!
//! The codec lives in [`ctfile`]; [`traits::StructureFile`] gives it the
//! reader/writer shape shared with file-level workflows.

pub mod ctfile;
pub mod error;
pub mod options;
pub mod traits;
