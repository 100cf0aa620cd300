//! Domain models for TRUSTFORGE.
//!
//! These are the core types shared across all crates.

pub mod assignment;
pub mod certificate;
pub mod custody;
pub mod operator;
