//! Trauma gate types
//!
//! This crate defines the canonical data shared by every stage of the engine:
//! - Evidence blocks and the per-patient evidence corpus
//! - Source categories and timestamp parsing
//! - Match provenance (`MatchDetail`) with acceptance tagging
//! - Gate and definition results with three-valued gate outcomes
//!
//! One representation is used from ingestion through reporting; there is no
//! separate "snippet" form of evidence.

pub mod evidence;
pub mod kind;
pub mod matching;
pub mod result;
pub mod source;
pub mod timestamp;

pub use evidence::*;
pub use kind::*;
pub use matching::*;
pub use result::*;
pub use source::*;
pub use timestamp::*;
