//! # Core Module
//!
//! Data models, element tables and the CTfile codec.
//!
//! - **Structures** ([`models`]) - Atoms, bonds, S-groups, R-groups, reaction
//!   graphics and enhanced stereo, held in one arena-backed `Structure`
//! - **Elements** ([`utils`]) - Periodic table lookups used to classify atom labels
//! - **File I/O** ([`io`]) - V2000/V3000 molfile, `$RXN` and `$MDL` readers and writers

pub mod io;
pub mod models;
pub mod utils;
