//! Definition evaluation
//!
//! Runs the gates of one protocol or event definition in three phases:
//! exclusions, triggers, requirements. A matched exclusion ends evaluation.
//! Requirement gates are always evaluated and recorded, but when nothing
//! triggers only `reportable` ones can move the verdict.

use crate::compiler::CompiledRuleSet;
use crate::context::EvaluationContext;
use crate::gate::{apply_fail_disposition, evaluate_gate, near_misses};
use chrono::{DateTime, Utc};
use trauma_gate_rules::{Definition, EvaluationMode, Gate};
use trauma_gate_types::{
    DefinitionKind, EvidenceCorpus, FinalOutcome, GateOutcome, GateResult, NearMiss,
    ProtocolResult,
};

/// Evaluate `definition` for the patient in `corpus`.
///
/// `definition` must belong to `rules`; the engine looks it up by id.
pub fn evaluate_definition(
    rules: &CompiledRuleSet,
    definition: &Definition,
    corpus: &EvidenceCorpus,
    evaluated_at: DateTime<Utc>,
) -> ProtocolResult {
    let ctx = EvaluationContext::new(rules, corpus);
    let mut run = DefinitionRun::new(&ctx, definition);

    let (final_outcome, summary) = if definition.evaluation_mode == EvaluationMode::ContextOnly {
        run.warnings.push(format!(
            "definition '{}' is context-only and was not evaluated",
            definition.id
        ));
        let outcome = match definition.kind {
            DefinitionKind::Protocol => FinalOutcome::NotTriggered,
            DefinitionKind::Event => FinalOutcome::NotEvaluated,
        };
        (outcome, "context-only definition: not evaluated".to_string())
    } else {
        run.verdict()
    };

    log::debug!(
        "definition '{}' for patient {}: {}",
        definition.id,
        corpus.patient_id(),
        final_outcome
    );

    ProtocolResult {
        patient_id: corpus.patient_id().to_string(),
        definition_id: definition.id.clone(),
        definition_name: definition.name.clone(),
        definition_version: definition.version.clone(),
        rule_set_version: rules.version().to_string(),
        kind: definition.kind,
        final_outcome,
        gate_results: run.results,
        near_misses: run.near_misses,
        summary,
        warnings: run.warnings,
        evaluated_at,
    }
}

struct DefinitionRun<'a, 'c> {
    ctx: &'c EvaluationContext<'a>,
    definition: &'c Definition,
    results: Vec<GateResult>,
    near_misses: Vec<NearMiss>,
    warnings: Vec<String>,
}

impl<'a, 'c> DefinitionRun<'a, 'c> {
    fn new(ctx: &'c EvaluationContext<'a>, definition: &'c Definition) -> Self {
        Self {
            ctx,
            definition,
            results: Vec::with_capacity(definition.gates.len()),
            near_misses: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn evaluate(&mut self, gate: &Gate) -> GateOutcome {
        let result = evaluate_gate(self.ctx, gate);
        self.record(result)
    }

    fn record(&mut self, result: GateResult) -> GateOutcome {
        if result.outcome == GateOutcome::Indeterminate {
            if let Some(code) = result.reason.code() {
                self.warnings.push(format!(
                    "{code}: gate '{}': {}",
                    result.gate_id,
                    result.reason.describe()
                ));
            }
        }
        let outcome = result.outcome;
        self.results.push(result);
        outcome
    }

    fn verdict(&mut self) -> (FinalOutcome, String) {
        let definition = self.definition;
        let kind = definition.kind;
        let gates = &definition.gates;

        for gate in gates.iter().filter(|g| g.is_exclusion()) {
            match self.evaluate(gate) {
                GateOutcome::Matched => {
                    let summary = format!("excluded: {}", self.last_explanation());
                    return (FinalOutcome::Excluded, summary);
                }
                GateOutcome::Indeterminate => self.warnings.push(format!(
                    "exclusion '{}' could not be ruled out",
                    gate.gate_id
                )),
                GateOutcome::NotMatched => {}
            }
        }

        let mut triggered = false;
        let mut trigger_indeterminate = false;
        for gate in gates.iter().filter(|g| g.is_trigger()) {
            match self.evaluate(gate) {
                GateOutcome::Matched => {
                    triggered = true;
                    if let Some(outcome) = gate.pass_outcome {
                        let summary = format!("{}: {}", outcome, self.last_explanation());
                        return (outcome, summary);
                    }
                }
                GateOutcome::Indeterminate => trigger_indeterminate = true,
                GateOutcome::NotMatched => {}
            }
        }

        let mut failed: Vec<usize> = Vec::new();
        let mut undetermined: Vec<usize> = Vec::new();
        for gate in gates.iter().filter(|g| !g.is_trigger() && !g.is_exclusion()) {
            let outcome = self.record(apply_fail_disposition(gate, evaluate_gate(self.ctx, gate)));
            let index = self.results.len() - 1;

            if outcome == GateOutcome::Matched && triggered {
                if let Some(pass) = gate.pass_outcome {
                    let summary = format!("{}: {}", pass, self.last_explanation());
                    return (pass, summary);
                }
            }
            let counts = gate.required && (triggered || gate.reportable);
            match outcome {
                GateOutcome::NotMatched if counts => failed.push(index),
                GateOutcome::Indeterminate if counts => undetermined.push(index),
                _ => {}
            }
        }

        if let Some(&index) = failed.first().or(undetermined.first()) {
            let gate_id = self.results[index].gate_id.as_str();
            if let Some(gate) = definition.gate(gate_id) {
                self.near_misses =
                    near_misses(self.ctx, gate, self.ctx.config().max_near_misses);
            }
        } else if !triggered {
            if let Some(gate) = gates.iter().find(|g| g.is_trigger()) {
                self.near_misses = near_misses(self.ctx, gate, self.ctx.config().max_near_misses);
            }
        }

        if !failed.is_empty() {
            let outcome = FinalOutcome::fail(kind);
            (outcome, self.summarize(outcome, &failed))
        } else if !undetermined.is_empty() {
            let outcome = FinalOutcome::undetermined(kind);
            (outcome, self.summarize(outcome, &undetermined))
        } else if !triggered && trigger_indeterminate {
            let outcome = FinalOutcome::undetermined(kind);
            let indices = self.trigger_indices(GateOutcome::Indeterminate);
            (outcome, self.summarize(outcome, &indices))
        } else if !triggered {
            let outcome = FinalOutcome::not_triggered(kind);
            let indices = self.trigger_indices(GateOutcome::NotMatched);
            (outcome, self.summarize(outcome, &indices))
        } else {
            let outcome = FinalOutcome::pass(kind);
            (outcome, format!("{outcome}: all required gates satisfied"))
        }
    }

    fn last_explanation(&self) -> String {
        self.results
            .last()
            .map(|r| format!("{}: {}", r.gate_id, r.explanation))
            .unwrap_or_default()
    }

    fn trigger_indices(&self, outcome: GateOutcome) -> Vec<usize> {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.outcome == outcome
                    && self
                        .definition
                        .gate(&r.gate_id)
                        .is_some_and(|g| g.is_trigger())
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn summarize(&self, outcome: FinalOutcome, indices: &[usize]) -> String {
        let parts: Vec<String> = indices
            .iter()
            .filter_map(|&i| self.results.get(i))
            .map(|r| format!("{}: {}", r.gate_id, r.explanation))
            .collect();
        if parts.is_empty() {
            outcome.to_string()
        } else {
            format!("{outcome}: {}", parts.join("; "))
        }
    }
}
