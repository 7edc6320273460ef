//! Trauma gate collaborator interfaces
//!
//! This crate provides:
//! - `EvidenceSource`: yields the evidence corpus for a patient
//! - `RuleSetSource`: yields versioned rule-set documents
//! - `ResultSink`: receives complete definition results
//! - In-memory implementations of all three, plus a JSON-backed rule source
//!
//! The engine itself never performs I/O; these seams are where ingestion,
//! rule loading and reporting plug in.

pub mod provider;
pub mod registry;

pub use provider::*;
pub use registry::*;
