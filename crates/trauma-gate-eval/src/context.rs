//! Evaluation context for one patient against one rule set

use crate::classifier::ContextClassifier;
use crate::compiler::{CompiledPatternSet, CompiledRuleSet};
use crate::config::EngineConfig;
use trauma_gate_diagnostics::Span;
use trauma_gate_types::EvidenceCorpus;

/// Borrowed inputs of a single evaluation.
///
/// Holds no mutable state: evaluating the same context twice gives the same
/// result.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    rules: &'a CompiledRuleSet,
    corpus: &'a EvidenceCorpus,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(rules: &'a CompiledRuleSet, corpus: &'a EvidenceCorpus) -> Self {
        Self { rules, corpus }
    }

    pub fn rules(&self) -> &'a CompiledRuleSet {
        self.rules
    }

    pub fn corpus(&self) -> &'a EvidenceCorpus {
        self.corpus
    }

    pub fn patterns(&self) -> &'a CompiledPatternSet {
        self.rules.patterns()
    }

    pub fn classifier(&self) -> &'a ContextClassifier {
        self.rules.classifier()
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.rules.config()
    }

    /// Reporting context around a match, whitespace collapsed
    pub fn snippet(&self, text: &str, span: Span) -> String {
        let chars = self.config().snippet_chars;
        span.widen(text, chars, chars)
            .slice(text)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
