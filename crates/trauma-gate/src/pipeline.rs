//! Evaluation pipeline over collaborator traits
//!
//! Pulls a rule set from a `RuleSetSource` and evidence from an
//! `EvidenceSource`, evaluates every definition, and publishes the results
//! to a `ResultSink`. A patient's results are published only after all of
//! its definitions have been evaluated.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use trauma_gate_eval::{CompiledRuleSet, GateEngine};
use trauma_gate_model::{EvidenceSource, ResultSink, RuleSetSource};
use trauma_gate_types::ProtocolResult;

/// Wiring of an engine to its collaborators
pub struct Pipeline<'a> {
    engine: &'a GateEngine,
    evidence: &'a dyn EvidenceSource,
    rules: &'a dyn RuleSetSource,
    sink: &'a dyn ResultSink,
}

/// A patient whose evaluation could not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFailure {
    pub patient_id: String,
    pub message: String,
}

/// Totals of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub rule_set_version: String,
    pub patients: usize,
    pub published: usize,
    /// Final outcome label to count
    pub outcomes: BTreeMap<String, usize>,
    pub failures: Vec<PatientFailure>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        engine: &'a GateEngine,
        evidence: &'a dyn EvidenceSource,
        rules: &'a dyn RuleSetSource,
        sink: &'a dyn ResultSink,
    ) -> Self {
        Self {
            engine,
            evidence,
            rules,
            sink,
        }
    }

    /// Compile the named rule-set version, or the source's current one
    pub fn load_rules(&self, version: Option<&str>) -> Result<Arc<CompiledRuleSet>> {
        let version = match version {
            Some(v) => v.to_string(),
            None => self
                .rules
                .current_version()
                .ok_or_else(|| anyhow!("rule source has no current version"))?,
        };
        let document = self
            .rules
            .rule_set(&version)
            .inspect_err(|err| log::error!("{}", err.to_diagnostic()))
            .with_context(|| format!("Failed to load rule set {version}"))?;
        let compiled = self
            .engine
            .compile(&document)
            .inspect_err(|err| log::error!("{}", err.to_diagnostic()))
            .with_context(|| format!("Failed to compile rule set {version}"))?;
        Ok(compiled)
    }

    /// Evaluate every definition for one patient and publish the results
    pub fn run_patient(
        &self,
        rules: &CompiledRuleSet,
        patient_id: &str,
        evaluated_at: DateTime<Utc>,
    ) -> Result<Vec<ProtocolResult>> {
        let corpus = self
            .evidence
            .corpus(patient_id)
            .with_context(|| format!("Failed to load evidence for patient {patient_id}"))?;
        log::debug!(
            "evaluating patient {} ({} block(s)) against rule set {}",
            patient_id,
            corpus.len(),
            rules.version()
        );

        let results = self.engine.evaluate_all(rules, &corpus, evaluated_at);
        for result in &results {
            self.sink.publish(result).with_context(|| {
                format!(
                    "Failed to publish {} for patient {}",
                    result.definition_id, patient_id
                )
            })?;
        }
        Ok(results)
    }

    /// Evaluate every patient the evidence source knows.
    ///
    /// A patient that fails is recorded and skipped; rule-set problems abort
    /// the run before any patient is evaluated.
    pub fn run_all(&self, version: Option<&str>, evaluated_at: DateTime<Utc>) -> Result<PipelineReport> {
        let rules = self.load_rules(version)?;
        let mut report = PipelineReport {
            rule_set_version: rules.version().to_string(),
            ..PipelineReport::default()
        };

        for patient_id in self.evidence.patient_ids() {
            report.patients += 1;
            match self.run_patient(&rules, &patient_id, evaluated_at) {
                Ok(results) => {
                    report.published += results.len();
                    for result in &results {
                        *report
                            .outcomes
                            .entry(result.final_outcome.as_str().to_string())
                            .or_default() += 1;
                    }
                }
                Err(err) => {
                    log::warn!("patient {patient_id} skipped: {err:#}");
                    report.failures.push(PatientFailure {
                        patient_id,
                        message: format!("{err:#}"),
                    });
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use trauma_gate_model::{
        InMemoryEvidenceSource, InMemoryResultSink, InMemoryRuleSetSource, ProviderError,
    };
    use trauma_gate_rules::{Definition, Gate, PatternRule, RuleSetDocument};
    use trauma_gate_types::{EvidenceBlock, EvidenceCorpus, SourceType};

    struct RejectingSink;

    impl ResultSink for RejectingSink {
        fn publish(&self, _result: &ProtocolResult) -> Result<(), ProviderError> {
            Err(ProviderError::Rejected("read-only".to_string()))
        }
    }

    fn rules() -> InMemoryRuleSetSource {
        InMemoryRuleSetSource::new().with_document(
            RuleSetDocument::new("v1")
                .with_pattern(PatternRule::new("hip_fx", [r"hip\s+fracture"]))
                .with_definition(
                    Definition::protocol("GHF", "Geriatric Hip Fracture", "1")
                        .with_gate(Gate::trigger("hip_fx", ["hip_fx"])),
                ),
        )
    }

    fn evidence() -> InMemoryEvidenceSource {
        InMemoryEvidenceSource::new()
            .with_corpus(EvidenceCorpus::new(
                "A",
                None,
                vec![EvidenceBlock::undated(SourceType::TraumaHp, "L hip fracture")],
            ))
            .with_corpus(EvidenceCorpus::new(
                "B",
                None,
                vec![EvidenceBlock::undated(SourceType::TraumaHp, "Wrist sprain")],
            ))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_run_all_publishes_every_result() {
        let engine = GateEngine::new();
        let (evidence, rules, sink) = (evidence(), rules(), InMemoryResultSink::new());
        let report = Pipeline::new(&engine, &evidence, &rules, &sink)
            .run_all(None, now())
            .unwrap();
        assert_eq!(report.rule_set_version, "v1");
        assert_eq!(report.patients, 2);
        assert_eq!(report.published, 2);
        assert_eq!(report.outcomes.get("COMPLIANT"), Some(&1));
        assert_eq!(report.outcomes.get("NOT_TRIGGERED"), Some(&1));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_unknown_version_aborts() {
        let engine = GateEngine::new();
        let (evidence, rules, sink) = (evidence(), rules(), InMemoryResultSink::new());
        let err = Pipeline::new(&engine, &evidence, &rules, &sink)
            .run_all(Some("v9"), now())
            .unwrap_err();
        assert!(format!("{err:#}").contains("v9"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_sink_failures_are_recorded_per_patient() {
        let engine = GateEngine::new();
        let (evidence, rules) = (evidence(), rules());
        let report = Pipeline::new(&engine, &evidence, &rules, &RejectingSink)
            .run_all(None, now())
            .unwrap();
        assert_eq!(report.published, 0);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures[0].message.contains("read-only"));
    }

    #[test]
    fn test_invalid_rule_set_fails_to_load() {
        let engine = GateEngine::new();
        let rules = InMemoryRuleSetSource::new().with_document(
            RuleSetDocument::new("broken").with_pattern(PatternRule::new("bad", [r"hip\s+("])),
        );
        let (evidence, sink) = (evidence(), InMemoryResultSink::new());
        let err = Pipeline::new(&engine, &evidence, &rules, &sink)
            .load_rules(Some("broken"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to compile rule set broken"));
    }
}
