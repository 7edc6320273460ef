//! Trauma gate rule definitions
//!
//! This crate provides:
//! - Pattern rules: named regex sets with historical exclusions
//! - Gates: single testable requirements over one or more patterns
//! - Protocol and NTDS event definitions as ordered gate lists
//! - JSON serialization of versioned rule-set documents
//!
//! Everything here is declarative. Validation and regex compilation happen
//! in `trauma-gate-eval` when a document is compiled into a rule set.

pub mod definition;
pub mod gate;
pub mod pattern;
pub mod serialize;

pub use definition::*;
pub use gate::*;
pub use pattern::*;
pub use serialize::{JsonSerializer, RuleSetSerializer, SerializeError};

pub use rust_decimal::Decimal;
pub use trauma_gate_types::{DefinitionKind, GateKind};
