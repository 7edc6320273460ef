//! Trauma gate diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by the
//! trauma-gate crates: structured error codes, rule definition errors raised
//! at compile time, and text spans used for match provenance.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for rule compilation
pub type Result<T> = std::result::Result<T, RuleDefinitionError>;
