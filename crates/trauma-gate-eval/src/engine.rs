//! Trauma gate engine
//!
//! This module provides the main `GateEngine` struct, which compiles rule
//! sets through its cache and evaluates definitions against a patient's
//! evidence corpus.

use crate::cache::RuleSetCache;
use crate::compiler::CompiledRuleSet;
use crate::config::EngineConfig;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::evaluate_definition;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use trauma_gate_rules::RuleSetDocument;
use trauma_gate_types::{EvidenceCorpus, ProtocolResult};

/// The main evaluation engine
///
/// The engine owns configuration and the compiled rule-set cache. Evaluation
/// itself is a pure function of the compiled rules and the corpus; the
/// engine can be shared across threads and called concurrently.
#[derive(Debug, Default)]
pub struct GateEngine {
    config: EngineConfig,
    cache: RuleSetCache,
}

impl GateEngine {
    /// Create an engine with default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom policy
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            cache: RuleSetCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &RuleSetCache {
        &self.cache
    }

    /// Validate and compile a rule-set document, reusing a cached
    /// compilation of the same version
    pub fn compile(&self, document: &RuleSetDocument) -> EvalResult<Arc<CompiledRuleSet>> {
        self.cache.get_or_compile(document, &self.config)
    }

    /// Evaluate one definition for one patient.
    ///
    /// `evaluated_at` is recorded on the result and never read otherwise, so
    /// the same inputs always give the same result.
    pub fn evaluate(
        &self,
        rules: &CompiledRuleSet,
        definition_id: &str,
        corpus: &EvidenceCorpus,
        evaluated_at: DateTime<Utc>,
    ) -> EvalResult<ProtocolResult> {
        let definition = rules
            .definition(definition_id)
            .ok_or_else(|| EvalError::unknown_definition(definition_id, rules.version()))?;
        Ok(evaluate_definition(rules, definition, corpus, evaluated_at))
    }

    /// Evaluate every definition of the rule set, in document order
    pub fn evaluate_all(
        &self,
        rules: &CompiledRuleSet,
        corpus: &EvidenceCorpus,
        evaluated_at: DateTime<Utc>,
    ) -> Vec<ProtocolResult> {
        rules
            .definitions()
            .map(|definition| evaluate_definition(rules, definition, corpus, evaluated_at))
            .collect()
    }
}
