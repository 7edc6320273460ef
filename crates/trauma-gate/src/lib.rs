//! Trauma-care evidence matching and gating for Rust
//!
//! This crate ties the trauma-gate crates together:
//! - Rule sets of regex patterns, gates and protocol/event definitions
//! - Historical, negation and admission-window filtering of matches
//! - Three-valued gate outcomes folded into explainable verdicts
//! - Collaborator traits for evidence, rules and result publication
//!
//! # Example
//!
//! ```ignore
//! use trauma_gate::{GateEngine, Pipeline};
//!
//! let engine = GateEngine::new();
//! let pipeline = Pipeline::new(&engine, &evidence, &rules, &sink);
//! let compiled = pipeline.load_rules(None)?;
//! let results = pipeline.run_patient(&compiled, "MRN-1", Utc::now())?;
//! ```

// Re-export all public APIs from internal crates
pub use trauma_gate_diagnostics as diagnostics;
pub use trauma_gate_eval as eval;
pub use trauma_gate_model as model;
pub use trauma_gate_rules as rules;
pub use trauma_gate_types as types;

pub mod pipeline;

// Convenience re-exports
pub use pipeline::{Pipeline, PipelineReport};
pub use trauma_gate_eval::{CompiledRuleSet, EngineConfig, EvalError, GateEngine};
pub use trauma_gate_model::{EvidenceSource, ResultSink, RuleSetSource};
pub use trauma_gate_rules::{Definition, Gate, PatternRule, RuleSetDocument};
pub use trauma_gate_types::{
    EvidenceBlock, EvidenceCorpus, FinalOutcome, GateOutcome, GateResult, ProtocolResult,
};
