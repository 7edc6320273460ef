//! Pattern and rule-set compilation
//!
//! Compilation validates everything that can be checked without evidence,
//! so that evaluation never meets a broken rule. A rule set either compiles
//! completely or not at all.

use crate::classifier::ContextClassifier;
use crate::config::{EngineConfig, MAX_SPAN_HOURS};
use indexmap::{IndexMap, IndexSet};
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use std::str::FromStr;
use trauma_gate_diagnostics::{RuleDefinitionError, Span};
use trauma_gate_rules::{Definition, EvaluationMode, Gate, GateKind, PatternRule, RuleSetDocument};
use trauma_gate_types::{BlockRef, EvidenceBlock};

/// A raw regex hit, before classification and filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub pattern_key: String,
    pub block: BlockRef,
    pub span: Span,
    pub matched_text: String,
}

/// One pattern rule with its regexes compiled
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    rule: PatternRule,
    inclusion: Vec<Regex>,
    exclusion: Vec<Regex>,
}

impl CompiledPattern {
    pub fn compile(rule: &PatternRule) -> Result<Self, RuleDefinitionError> {
        if rule.inclusion.iter().all(|p| p.trim().is_empty()) {
            return Err(RuleDefinitionError::EmptyPattern {
                pattern_key: rule.pattern_key.clone(),
            });
        }
        Ok(Self {
            rule: rule.clone(),
            inclusion: compile_all(&rule.pattern_key, &rule.inclusion)?,
            exclusion: compile_all(&rule.pattern_key, &rule.historical_exclusion)?,
        })
    }

    pub fn key(&self) -> &str {
        &self.rule.pattern_key
    }

    pub fn rule(&self) -> &PatternRule {
        &self.rule
    }

    pub fn exclusions(&self) -> &[Regex] {
        &self.exclusion
    }

    /// Whether any inclusion regex hits `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.inclusion.iter().any(|re| re.is_match(text))
    }

    /// Whether every inclusion regex has a capture group for a value
    pub fn captures_values(&self) -> bool {
        self.inclusion.iter().all(|re| re.captures_len() > 1)
    }

    /// The number captured by the inclusion regex that produced the hit at
    /// `span`: the first participating group that parses as a decimal.
    pub fn capture_value(&self, text: &str, span: Span) -> Option<Decimal> {
        self.inclusion.iter().find_map(|re| {
            let caps = re.captures_at(text, span.start)?;
            let whole = caps.get(0)?;
            if whole.start() != span.start || whole.end() != span.end {
                return None;
            }
            caps.iter()
                .skip(1)
                .flatten()
                .find_map(|group| Decimal::from_str(group.as_str()).ok())
        })
    }

    /// All inclusion hits in `block`, ordered by position.
    ///
    /// Blocks outside the rule's applicable source types yield nothing.
    /// Required context keys are not checked here.
    pub fn find_candidates(&self, block_ref: BlockRef, block: &EvidenceBlock) -> Vec<MatchCandidate> {
        if !self.rule.applies_to(block.source_type) {
            return Vec::new();
        }
        let text = block.raw_text.as_str();
        let mut spans: Vec<Span> = self
            .inclusion
            .iter()
            .flat_map(|re| re.find_iter(text))
            .filter(|m| !m.is_empty())
            .map(|m| Span::new(m.start(), m.end()))
            .collect();
        spans.sort_by_key(|s| (s.start, s.end));
        spans.dedup();
        spans
            .into_iter()
            .map(|span| MatchCandidate {
                pattern_key: self.rule.pattern_key.clone(),
                block: block_ref,
                span,
                matched_text: span.slice(text).to_string(),
            })
            .collect()
    }
}

fn compile_all(pattern_key: &str, sources: &[String]) -> Result<Vec<Regex>, RuleDefinitionError> {
    sources
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .map_err(|e| RuleDefinitionError::invalid_regex(pattern_key, p, e.to_string()))
        })
        .collect()
}

/// Validated, compiled patterns keyed by pattern key
#[derive(Debug, Clone, Default)]
pub struct CompiledPatternSet {
    patterns: IndexMap<String, CompiledPattern>,
}

impl CompiledPatternSet {
    pub fn compile(rules: &[PatternRule]) -> Result<Self, RuleDefinitionError> {
        let mut patterns = IndexMap::with_capacity(rules.len());
        for rule in rules {
            if patterns.contains_key(&rule.pattern_key) {
                return Err(RuleDefinitionError::DuplicatePatternKey {
                    pattern_key: rule.pattern_key.clone(),
                });
            }
            patterns.insert(rule.pattern_key.clone(), CompiledPattern::compile(rule)?);
        }
        for rule in rules {
            if let Some(missing) = rule
                .required_context_keys
                .iter()
                .find(|key| !patterns.contains_key(key.as_str()))
            {
                return Err(RuleDefinitionError::DanglingContextKey {
                    pattern_key: rule.pattern_key.clone(),
                    context_key: missing.clone(),
                });
            }
        }
        Ok(Self { patterns })
    }

    pub fn get(&self, pattern_key: &str) -> Option<&CompiledPattern> {
        self.patterns.get(pattern_key)
    }

    pub fn contains(&self, pattern_key: &str) -> bool {
        self.patterns.contains_key(pattern_key)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Candidates for `pattern_key` in `block`, honouring required context
    /// keys: when the rule names any, the block must also hit one of them.
    pub fn find_candidates(
        &self,
        pattern_key: &str,
        block_ref: BlockRef,
        block: &EvidenceBlock,
    ) -> Vec<MatchCandidate> {
        let Some(pattern) = self.get(pattern_key) else {
            return Vec::new();
        };
        let candidates = pattern.find_candidates(block_ref, block);
        let context_keys = &pattern.rule().required_context_keys;
        if candidates.is_empty() || context_keys.is_empty() {
            return candidates;
        }
        let has_context = context_keys
            .iter()
            .filter_map(|key| self.get(key))
            .any(|ctx| ctx.is_match(&block.raw_text));
        if has_context {
            candidates
        } else {
            log::trace!(
                "pattern '{}' in block {}: no required context, {} candidate(s) dropped",
                pattern_key,
                block_ref,
                candidates.len()
            );
            Vec::new()
        }
    }
}

/// A fully validated rule set, ready for evaluation.
///
/// Immutable once built and safe to share across threads.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    version: String,
    patterns: CompiledPatternSet,
    definitions: IndexMap<String, Definition>,
    classifier: ContextClassifier,
    config: EngineConfig,
}

impl CompiledRuleSet {
    pub fn compile(
        document: &RuleSetDocument,
        config: &EngineConfig,
    ) -> Result<Self, RuleDefinitionError> {
        let classifier = ContextClassifier::new(config)?;
        let patterns = CompiledPatternSet::compile(&document.patterns)?;

        let mut definitions = IndexMap::with_capacity(document.definitions.len());
        for definition in &document.definitions {
            if definitions.contains_key(&definition.id) {
                return Err(RuleDefinitionError::DuplicateDefinition {
                    definition_id: definition.id.clone(),
                });
            }
            validate_definition(definition, &patterns)?;
            definitions.insert(definition.id.clone(), definition.clone());
        }

        log::debug!(
            "compiled rule set {}: {} pattern(s), {} definition(s)",
            document.version,
            patterns.len(),
            definitions.len()
        );

        Ok(Self {
            version: document.version.clone(),
            patterns,
            definitions,
            classifier,
            config: config.clone(),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn patterns(&self) -> &CompiledPatternSet {
        &self.patterns
    }

    pub fn classifier(&self) -> &ContextClassifier {
        &self.classifier
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.get(id)
    }

    /// Definitions in document order
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }
}

fn validate_definition(
    definition: &Definition,
    patterns: &CompiledPatternSet,
) -> Result<(), RuleDefinitionError> {
    let mut gate_ids = IndexSet::with_capacity(definition.gates.len());
    for gate in &definition.gates {
        if !gate_ids.insert(gate.gate_id.as_str()) {
            return Err(RuleDefinitionError::DuplicateGateId {
                definition_id: definition.id.clone(),
                gate_id: gate.gate_id.clone(),
            });
        }
        validate_gate(definition, gate, patterns)?;
    }

    let has_trigger = definition.gates.iter().any(Gate::is_trigger);
    if !has_trigger && definition.evaluation_mode == EvaluationMode::Full {
        return Err(RuleDefinitionError::MissingTrigger {
            definition_id: definition.id.clone(),
        });
    }
    Ok(())
}

fn validate_gate(
    definition: &Definition,
    gate: &Gate,
    patterns: &CompiledPatternSet,
) -> Result<(), RuleDefinitionError> {
    if gate.pattern_keys.is_empty() {
        return Err(RuleDefinitionError::EmptyGate {
            definition_id: definition.id.clone(),
            gate_id: gate.gate_id.clone(),
        });
    }

    for key in &gate.pattern_keys {
        let pattern = patterns.get(key).ok_or_else(|| {
            RuleDefinitionError::dangling_pattern(&definition.id, &gate.gate_id, key)
        })?;
        if gate.kind == GateKind::RequiresTreatmentAny && !pattern.rule().is_treatment() {
            return Err(RuleDefinitionError::NotATreatmentPattern {
                definition_id: definition.id.clone(),
                gate_id: gate.gate_id.clone(),
                pattern_key: key.clone(),
            });
        }
    }

    if gate.source_types.as_ref().is_some_and(Vec::is_empty) {
        return Err(RuleDefinitionError::EmptySourceScope {
            definition_id: definition.id.clone(),
            gate_id: gate.gate_id.clone(),
        });
    }

    if let Some(outcome) = gate.pass_outcome {
        if !outcome.is_gate_outcome_for(definition.kind) {
            return Err(RuleDefinitionError::InvalidPassOutcome {
                definition_id: definition.id.clone(),
                gate_id: gate.gate_id.clone(),
                outcome: outcome.to_string(),
                kind: definition.kind.to_string(),
            });
        }
    }

    if let Some(window) = &gate.admission_window {
        for (name, hours) in [
            ("window_hours", window.window_hours),
            ("lookback_hours", window.lookback_hours),
        ] {
            if hours.is_some_and(|h| h > MAX_SPAN_HOURS) {
                return Err(RuleDefinitionError::invalid_timing(
                    &definition.id,
                    &gate.gate_id,
                    format!("{name} exceeds the {MAX_SPAN_HOURS}h limit"),
                ));
            }
        }
    }

    if gate.kind == GateKind::NumericThreshold {
        let invalid = |message: &str| {
            Err(RuleDefinitionError::invalid_threshold(
                &definition.id,
                &gate.gate_id,
                message,
            ))
        };
        if gate.threshold.is_none() {
            return invalid("numeric_threshold gate has no threshold");
        }
        if gate.pattern_keys.len() != 1 {
            return invalid("numeric_threshold gate must reference exactly one pattern");
        }
        let captures = patterns
            .get(&gate.pattern_keys[0])
            .is_some_and(CompiledPattern::captures_values);
        if !captures {
            return invalid("threshold pattern has an inclusion regex without a capture group");
        }
    } else if gate.threshold.is_some() {
        return Err(RuleDefinitionError::invalid_threshold(
            &definition.id,
            &gate.gate_id,
            format!("{} gate cannot declare a threshold", gate.kind),
        ));
    }

    if gate.kind == GateKind::TimingAfterArrival {
        let invalid = |message: &str| {
            Err(RuleDefinitionError::invalid_timing(
                &definition.id,
                &gate.gate_id,
                message,
            ))
        };
        match gate.timing {
            None => return invalid("timing_after_arrival gate has no timing constraint"),
            Some(timing) if timing.total_minutes() == 0 => {
                return invalid("timing constraint must be longer than zero");
            }
            Some(timing) if timing.total_minutes() > i64::from(MAX_SPAN_HOURS) * 60 => {
                return invalid("timing constraint exceeds the maximum span");
            }
            Some(_) => {}
        }
        if gate.pattern_keys.len() != 1 {
            return invalid("timing_after_arrival gate must reference exactly one pattern");
        }
        if gate.admission_window.is_some() {
            return invalid("timing_after_arrival gate cannot also declare an admission window");
        }
    }
    Ok(())
}
