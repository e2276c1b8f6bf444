//! # Workflows Module
//!
//! High-level entry points that tie the codec to the filesystem.
//!
//! - **Conversion Workflow** ([`convert`]) - Read a CTfile from disk, write a
//!   structure to disk, or re-encode one file into another dialect.

pub mod convert;
