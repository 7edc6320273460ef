//! Trauma Gate Evaluation Engine
//!
//! This crate matches versioned pattern rules against a patient's evidence
//! corpus and folds the matches into protocol and event verdicts. It is
//! deterministic: identical rules and evidence give identical results.
//!
//! # Pipeline
//!
//! - **Compilation** (`compiler`): validates a `RuleSetDocument` and builds
//!   every regex once. Broken rules are rejected before any patient is seen.
//! - **Classification** (`classifier`): tags each match as historical or
//!   current from section headers, inline phrasing and relative dates.
//! - **Negation** (`negation`): tags matches inside a negated clause.
//! - **Temporal filter** (`temporal`): places a block relative to a gate's
//!   admission window.
//! - **Gate evaluation** (`gate`): one function per gate kind, producing a
//!   three-valued outcome with its reason and full match provenance.
//! - **Definition evaluation** (`evaluator`): exclusions, then triggers, then
//!   requirements, folded into the final verdict.
//!
//! # Example
//!
//! ```ignore
//! use trauma_gate_eval::GateEngine;
//!
//! let engine = GateEngine::new();
//! let rules = engine.compile(&document)?;
//! let result = engine.evaluate(&rules, "GERIATRIC_HIP", &corpus, Utc::now())?;
//! println!("{}", result.to_json()?);
//! ```
//!
//! # Fail-closed
//!
//! Missing data never reads as a pass or a fail. A gate whose source types
//! are absent, whose window has no reference time, or whose only evidence is
//! undated reports INDETERMINATE with the reason attached.

pub mod cache;
pub mod classifier;
pub mod compiler;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod negation;
pub mod temporal;

// Re-export main types
pub use cache::{CacheStats, RuleSetCache};
pub use classifier::ContextClassifier;
pub use compiler::{CompiledPattern, CompiledPatternSet, CompiledRuleSet, MatchCandidate};
pub use config::{ClassifierTables, EngineConfig};
pub use context::EvaluationContext;
pub use engine::GateEngine;
pub use error::{EvalError, EvalResult};
pub use evaluator::evaluate_definition;
pub use gate::{evaluate_gate, near_misses};
pub use negation::is_negated;
pub use temporal::{GateWindow, ResolvedWindow};
