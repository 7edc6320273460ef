//! Gate evaluation
//!
//! A gate scans the corpus for its patterns, tags every hit with its
//! historical, negation and window status, and folds the accepted hits into
//! a three-valued outcome. Rejected hits are recorded alongside accepted
//! ones so a non-passing gate can show what it saw.

use crate::context::EvaluationContext;
use crate::negation::is_negated;
use crate::temporal::GateWindow;
use chrono::{Duration, NaiveDateTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use trauma_gate_rules::{FailDisposition, Gate, GateKind};
use trauma_gate_types::{
    EvidenceBlock, GateOutcome, GateReason, GateResult, MatchDetail, NearMiss, SourceType,
    TimingReport, WindowStatus,
};

/// Source types a gate reads; `None` reads every block
type SourceScope = Option<SmallVec<[SourceType; 4]>>;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Evaluate one gate against the context's corpus
pub fn evaluate_gate(ctx: &EvaluationContext<'_>, gate: &Gate) -> GateResult {
    let scope = source_scope(ctx, gate);
    let window = GateWindow::resolve(
        gate.admission_window.as_ref(),
        ctx.corpus().reference_time(),
        ctx.config().default_window_hours,
        ctx.config().default_lookback_hours,
    );
    let scan = scan(ctx, gate, &scope, &window);

    let mut timing = None;
    let (outcome, reason) = if !scan.any_searchable() {
        (
            GateOutcome::Indeterminate,
            GateReason::SourceTypeAbsent {
                source_types: scope.map(|s| s.to_vec()).unwrap_or_default(),
            },
        )
    } else if window == GateWindow::Unanchored {
        (GateOutcome::Indeterminate, GateReason::ReferenceTimeUnavailable)
    } else if window == GateWindow::OutOfRange {
        (GateOutcome::Indeterminate, GateReason::WindowOutOfRange)
    } else {
        match gate.kind {
            GateKind::EvidenceAny | GateKind::RequiresTreatmentAny | GateKind::Exclusion => {
                any_outcome(gate, &scan)
            }
            GateKind::EvidenceAll => all_outcome(ctx, gate, &scan),
            GateKind::NumericThreshold => threshold_outcome(gate, &scan),
            GateKind::TimingAfterArrival => {
                let (outcome, reason, report) = timing_outcome(ctx, gate, &scan);
                timing = report;
                (outcome, reason)
            }
        }
    };

    let explanation = explain(gate, outcome, &reason, &scan.details, timing.as_ref());
    match outcome {
        GateOutcome::Indeterminate => log::warn!(
            "gate '{}' indeterminate for patient {}: {}",
            gate.gate_id,
            ctx.corpus().patient_id(),
            reason.describe()
        ),
        _ => log::debug!(
            "gate '{}' {} ({} detail(s))",
            gate.gate_id,
            outcome,
            scan.details.len()
        ),
    }

    GateResult {
        gate_id: gate.gate_id.clone(),
        kind: gate.kind,
        outcome,
        reason,
        explanation,
        match_details: scan.details,
        timing,
    }
}

/// Report a NOT_MATCHED requirement as indeterminate when the gate treats
/// absence as missing documentation
pub fn apply_fail_disposition(gate: &Gate, mut result: GateResult) -> GateResult {
    if gate.on_fail == FailDisposition::Indeterminate && result.outcome == GateOutcome::NotMatched
    {
        result.outcome = GateOutcome::Indeterminate;
        result.explanation = format!("documentation not found: {}", result.explanation);
    }
    result
}

/// Unfiltered hits of the gate's patterns, one per block, for reporting
pub fn near_misses(ctx: &EvaluationContext<'_>, gate: &Gate, limit: usize) -> Vec<NearMiss> {
    let mut misses = Vec::new();
    for (block_ref, block) in ctx.corpus().iter() {
        if misses.len() >= limit {
            break;
        }
        let first = gate.pattern_keys.iter().find_map(|key| {
            ctx.patterns()
                .get(key)
                .and_then(|p| p.find_candidates(block_ref, block).into_iter().next())
        });
        if let Some(candidate) = first {
            misses.push(NearMiss {
                block: block_ref,
                source_type: block.source_type,
                timestamp: block.datetime(),
                pattern_key: candidate.pattern_key,
                snippet: ctx.snippet(&block.raw_text, candidate.span),
            });
        }
    }
    misses
}

fn source_scope(ctx: &EvaluationContext<'_>, gate: &Gate) -> SourceScope {
    if let Some(types) = &gate.source_types {
        return Some(types.iter().copied().collect());
    }
    let mut scope = SmallVec::new();
    for key in &gate.pattern_keys {
        let restricted = ctx
            .patterns()
            .get(key)
            .and_then(|p| p.rule().applicable_source_types.as_ref())?;
        for source in restricted {
            if !scope.contains(source) {
                scope.push(*source);
            }
        }
    }
    Some(scope)
}

fn in_scope(scope: &SourceScope, source: SourceType) -> bool {
    scope.as_ref().is_none_or(|s| s.contains(&source))
}

/// Per-pattern counts gathered while scanning
#[derive(Debug, Default)]
struct KeyTally {
    /// At least one block in scope is readable by the pattern
    searchable: bool,
    accepted: usize,
    historical: usize,
    negated: usize,
    outside_window: usize,
    undated_missing: usize,
    undated_malformed: usize,
    /// Current values that miss the gate threshold
    off_threshold: usize,
    observed: Vec<Decimal>,
    accepted_times: Vec<NaiveDateTime>,
}

impl KeyTally {
    fn undated(&self) -> usize {
        self.undated_missing + self.undated_malformed
    }
}

struct Scan {
    details: Vec<MatchDetail>,
    tallies: IndexMap<String, KeyTally>,
}

impl Scan {
    fn any_searchable(&self) -> bool {
        self.tallies.values().any(|t| t.searchable)
    }

    fn accepted(&self) -> usize {
        self.tallies.values().map(|t| t.accepted).sum()
    }

    fn rejected_reason(&self) -> Option<GateReason> {
        let (historical, negated, outside_window) =
            self.tallies.values().fold((0, 0, 0), |(h, n, o), t| {
                (h + t.historical, n + t.negated, o + t.outside_window)
            });
        (historical + negated + outside_window > 0).then_some(GateReason::EvidenceRejected {
            historical,
            negated,
            outside_window,
        })
    }

    fn undated_reason(&self) -> Option<GateReason> {
        let (missing, malformed) = self.tallies.values().fold((0, 0), |(m, f), t| {
            (m + t.undated_missing, f + t.undated_malformed)
        });
        (missing + malformed > 0).then_some(GateReason::EvidenceUndated { missing, malformed })
    }

    fn off_threshold(&self) -> usize {
        self.tallies.values().map(|t| t.off_threshold).sum()
    }
}

fn scan(
    ctx: &EvaluationContext<'_>,
    gate: &Gate,
    scope: &SourceScope,
    window: &GateWindow,
) -> Scan {
    let config = ctx.config();
    let cap = config.max_details_per_pattern;
    let mut details = Vec::new();
    let mut tallies = IndexMap::with_capacity(gate.pattern_keys.len());

    for key in &gate.pattern_keys {
        let mut tally = KeyTally::default();
        let Some(pattern) = ctx.patterns().get(key) else {
            tallies.insert(key.clone(), tally);
            continue;
        };
        let (mut kept_accepted, mut kept_rejected) = (0, 0);

        for (block_ref, block) in ctx.corpus().iter() {
            if !in_scope(scope, block.source_type) || !pattern.rule().applies_to(block.source_type)
            {
                continue;
            }
            tally.searchable = true;
            let status = block_window(gate, window, block);

            for candidate in ctx.patterns().find_candidates(key, block_ref, block) {
                let text = block.raw_text.as_str();
                // threshold gates only count hits that carry a value
                let value = match gate.threshold {
                    Some(_) => match pattern.capture_value(text, candidate.span) {
                        Some(value) => Some(value),
                        None => continue,
                    },
                    None => None,
                };
                let is_historical =
                    ctx.classifier()
                        .is_historical(text, candidate.span, pattern.exclusions());
                let is_negated = gate.negation_aware
                    && is_negated(
                        text,
                        candidate.span,
                        config.negation_pre_chars,
                        config.negation_post_chars,
                    );

                let accepted = if is_historical && !gate.allow_historical {
                    tally.historical += 1;
                    false
                } else if is_negated {
                    tally.negated += 1;
                    false
                } else if status.is_out_of_window() {
                    tally.outside_window += 1;
                    false
                } else if status == WindowStatus::Undated {
                    if block.timestamp.is_malformed() {
                        tally.undated_malformed += 1;
                    } else {
                        tally.undated_missing += 1;
                    }
                    false
                } else if let (Some(threshold), Some(observed)) = (gate.threshold, value) {
                    let met = status.admits() && threshold.is_met_by(observed);
                    if status.admits() && !met {
                        tally.off_threshold += 1;
                        if tally.observed.len() < cap {
                            tally.observed.push(observed);
                        }
                    }
                    met
                } else {
                    status.admits()
                };

                if accepted {
                    tally.accepted += 1;
                    tally.accepted_times.extend(block.datetime());
                }

                let detail = MatchDetail {
                    surrounding_context: ctx.snippet(text, candidate.span),
                    pattern_key: candidate.pattern_key,
                    matched_text: candidate.matched_text,
                    block: block_ref,
                    source_type: block.source_type,
                    timestamp: block.datetime(),
                    span: candidate.span,
                    is_historical,
                    is_negated,
                    window: status,
                    accepted,
                    value,
                };
                if let Some(rejection) = detail.rejection() {
                    log::trace!(
                        "gate '{}': discarded '{}' in block {} ({:?})",
                        gate.gate_id,
                        detail.matched_text,
                        block_ref,
                        rejection
                    );
                }

                let keep = if accepted {
                    kept_accepted += 1;
                    kept_accepted <= cap
                } else {
                    kept_rejected += 1;
                    kept_rejected <= cap
                };
                if keep {
                    details.push(detail);
                }

                // one accepted hit per block and pattern is enough
                if accepted {
                    break;
                }
            }
        }
        tallies.insert(key.clone(), tally);
    }

    Scan { details, tallies }
}

/// Window status of a block for this gate. Timing gates need a timestamp on
/// every block even though they carry no admission window.
fn block_window(gate: &Gate, window: &GateWindow, block: &EvidenceBlock) -> WindowStatus {
    let status = window.classify(&block.timestamp);
    if gate.kind == GateKind::TimingAfterArrival && block.datetime().is_none() {
        WindowStatus::Undated
    } else {
        status
    }
}

fn any_outcome(gate: &Gate, scan: &Scan) -> (GateOutcome, GateReason) {
    let required = gate.min_count.max(1);
    let found = scan.accepted();
    if found >= required {
        (GateOutcome::Matched, GateReason::Satisfied)
    } else if let Some(reason) = scan.undated_reason() {
        (GateOutcome::Indeterminate, reason)
    } else if found > 0 {
        (
            GateOutcome::NotMatched,
            GateReason::BelowMinimumCount { found, required },
        )
    } else if let Some(reason) = scan.rejected_reason() {
        (GateOutcome::NotMatched, reason)
    } else {
        (GateOutcome::NotMatched, GateReason::NoEvidence)
    }
}

fn all_outcome(ctx: &EvaluationContext<'_>, gate: &Gate, scan: &Scan) -> (GateOutcome, GateReason) {
    let mut missing = Vec::new();
    let mut absent: Vec<SourceType> = Vec::new();
    let mut undated = false;

    for (key, tally) in &scan.tallies {
        if tally.accepted > 0 {
            continue;
        }
        if !tally.searchable {
            for source in key_sources(ctx, gate, key) {
                if !absent.contains(&source) {
                    absent.push(source);
                }
            }
        } else if tally.undated() > 0 {
            undated = true;
        } else {
            missing.push(key.clone());
        }
    }

    if !missing.is_empty() {
        (
            GateOutcome::NotMatched,
            GateReason::PatternsMissing {
                pattern_keys: missing,
            },
        )
    } else if !absent.is_empty() {
        (
            GateOutcome::Indeterminate,
            GateReason::SourceTypeAbsent {
                source_types: absent,
            },
        )
    } else if undated {
        let reason = scan.undated_reason().unwrap_or(GateReason::EvidenceUndated {
            missing: 0,
            malformed: 0,
        });
        (GateOutcome::Indeterminate, reason)
    } else {
        (GateOutcome::Matched, GateReason::Satisfied)
    }
}

fn threshold_outcome(gate: &Gate, scan: &Scan) -> (GateOutcome, GateReason) {
    let Some(threshold) = gate.threshold else {
        // compilation guarantees a threshold
        return (GateOutcome::Indeterminate, GateReason::ValueNotDocumented);
    };
    let required = gate.min_count.max(1);
    let met = scan.accepted();
    if met >= required {
        (GateOutcome::Matched, GateReason::Satisfied)
    } else if let Some(reason) = scan.undated_reason() {
        (GateOutcome::Indeterminate, reason)
    } else if met > 0 {
        (
            GateOutcome::NotMatched,
            GateReason::BelowMinimumCount {
                found: met,
                required,
            },
        )
    } else if scan.off_threshold() > 0 {
        let observed = scan
            .tallies
            .values()
            .flat_map(|t| t.observed.iter().copied())
            .collect();
        (
            GateOutcome::NotMatched,
            GateReason::ThresholdNotMet {
                condition: threshold.to_string(),
                observed,
            },
        )
    } else if let Some(reason) = scan.rejected_reason() {
        (GateOutcome::NotMatched, reason)
    } else {
        (GateOutcome::Indeterminate, GateReason::ValueNotDocumented)
    }
}

fn key_sources(ctx: &EvaluationContext<'_>, gate: &Gate, key: &str) -> Vec<SourceType> {
    let pattern_sources = ctx
        .patterns()
        .get(key)
        .and_then(|p| p.rule().applicable_source_types.clone());
    match (&gate.source_types, pattern_sources) {
        (Some(gate_sources), Some(pattern_sources)) => gate_sources
            .iter()
            .copied()
            .filter(|s| pattern_sources.contains(s))
            .collect(),
        (Some(gate_sources), None) => gate_sources.clone(),
        (None, Some(pattern_sources)) => pattern_sources,
        (None, None) => Vec::new(),
    }
}

fn timing_outcome(
    ctx: &EvaluationContext<'_>,
    gate: &Gate,
    scan: &Scan,
) -> (GateOutcome, GateReason, Option<TimingReport>) {
    let Some(constraint) = gate.timing else {
        // compilation guarantees a constraint
        return (GateOutcome::Indeterminate, GateReason::TimingNotMet, None);
    };
    let Some(reference) = ctx.corpus().reference_time() else {
        return (
            GateOutcome::Indeterminate,
            GateReason::ReferenceTimeUnavailable,
            None,
        );
    };
    let Some(deadline) =
        reference.checked_add_signed(Duration::minutes(constraint.total_minutes()))
    else {
        return (GateOutcome::Indeterminate, GateReason::WindowOutOfRange, None);
    };
    let times = scan.tallies.values().flat_map(|t| t.accepted_times.iter().copied());

    let (mut qualifying, mut late, mut early) = (None, None, None);
    for at in times {
        let slot = if at > deadline {
            &mut late
        } else if constraint.not_before_reference && at < reference {
            &mut early
        } else {
            &mut qualifying
        };
        *slot = Some(slot.map_or(at, |prev: NaiveDateTime| prev.min(at)));
    }

    let report = TimingReport {
        constraint: constraint.to_string(),
        reference_time: reference,
        deadline,
        qualifying_timestamp: qualifying,
        earliest_late_timestamp: late,
        earliest_early_timestamp: early,
        last_evidence_timestamp: ctx.corpus().last_timestamp(),
    };

    let (outcome, reason) = if qualifying.is_some() {
        (GateOutcome::Matched, GateReason::Satisfied)
    } else if let Some(reason) = scan.undated_reason() {
        (GateOutcome::Indeterminate, reason)
    } else if late.is_some() || early.is_some() {
        (GateOutcome::NotMatched, GateReason::TimingNotMet)
    } else if let Some(reason) = scan.rejected_reason() {
        (GateOutcome::NotMatched, reason)
    } else {
        (GateOutcome::NotMatched, GateReason::NoEvidence)
    };
    (outcome, reason, Some(report))
}

fn explain(
    gate: &Gate,
    outcome: GateOutcome,
    reason: &GateReason,
    details: &[MatchDetail],
    timing: Option<&TimingReport>,
) -> String {
    match outcome {
        GateOutcome::Matched => explain_match(gate, details, timing),
        GateOutcome::Indeterminate => format!("cannot determine: {}", reason.describe()),
        GateOutcome::NotMatched => {
            let text = match (gate.kind, timing) {
                (GateKind::TimingAfterArrival, Some(report)) => explain_timing_failure(report),
                (GateKind::RequiresTreatmentAny, _) => {
                    format!("treatment not found: {}", reason.describe())
                }
                (GateKind::Exclusion, _) => match reason {
                    GateReason::NoEvidence => "no exclusion criteria found".to_string(),
                    other => format!("no exclusion criteria found: {}", other.describe()),
                },
                _ => reason.describe(),
            };
            match &gate.fail_reason {
                Some(prefix) => format!("{prefix}: {text}"),
                None => text,
            }
        }
    }
}

fn explain_match(gate: &Gate, details: &[MatchDetail], timing: Option<&TimingReport>) -> String {
    if let Some(report) = timing {
        if let Some(at) = report.qualifying_timestamp {
            return format!(
                "documented at {}, {} arrival at {} (limit {})",
                at.format(TIME_FORMAT),
                relative(at - report.reference_time),
                report.reference_time.format(TIME_FORMAT),
                report.constraint
            );
        }
    }
    let mut accepted = details.iter().filter(|d| d.accepted);
    let Some(first) = accepted.next() else {
        return "matched".to_string();
    };
    let when = first
        .timestamp
        .map(|t| format!(" at {}", t.format(TIME_FORMAT)))
        .unwrap_or_default();
    let more = accepted.count();
    let prefix = if gate.kind == GateKind::Exclusion {
        "exclusion criteria met: "
    } else {
        ""
    };
    let suffix = if more > 0 {
        format!(" (+{more} more)")
    } else {
        String::new()
    };
    let value = match (gate.threshold, first.value) {
        (Some(threshold), Some(observed)) => format!(", value {observed} meets {threshold}"),
        _ => String::new(),
    };
    format!(
        "{prefix}found '{}' ({}) in {}{}{}{}",
        first.matched_text, first.pattern_key, first.source_type, when, value, suffix
    )
}

fn explain_timing_failure(report: &TimingReport) -> String {
    let requirement = format!(
        "required within {} of arrival at {} (deadline {})",
        report.constraint,
        report.reference_time.format(TIME_FORMAT),
        report.deadline.format(TIME_FORMAT)
    );
    if let Some(late) = report.earliest_late_timestamp {
        return format!(
            "{requirement}; earliest evidence at {} is {} arrival",
            late.format(TIME_FORMAT),
            relative(late - report.reference_time)
        );
    }
    if let Some(early) = report.earliest_early_timestamp {
        return format!(
            "{requirement}; evidence only before arrival (earliest {})",
            early.format(TIME_FORMAT)
        );
    }
    let last = report
        .last_evidence_timestamp
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "none".to_string());
    format!("{requirement}; no qualifying evidence found; last evidence timestamp {last}")
}

/// "51h after", "1h 30m before"
fn relative(delta: Duration) -> String {
    let minutes = delta.num_minutes();
    let side = if minutes < 0 { "before" } else { "after" };
    let minutes = minutes.unsigned_abs();
    let span = match (minutes / 60, minutes % 60) {
        (h, 0) if h > 0 => format!("{h}h"),
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m}m"),
    };
    format!("{span} {side}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompiledRuleSet;
    use crate::config::EngineConfig;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use trauma_gate_rules::{
        AdmissionWindow, ComparisonOp, Definition, GateRole, NumericThreshold, PatternRule,
        RuleSetDocument, TimingConstraint,
    };
    use trauma_gate_types::{BlockTimestamp, EvidenceCorpus};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn rules(gates: Vec<Gate>) -> CompiledRuleSet {
        let mut definition = Definition::protocol("D", "Test", "1")
            .with_gate(Gate::trigger("trigger", ["hip_fx"]));
        definition.gates.extend(gates);
        let doc = RuleSetDocument::new("test")
            .with_pattern(PatternRule::new("hip_fx", [r"hip\s+fracture"]))
            .with_pattern(PatternRule::new("elderly", [r"\b(?:[6-9]\d|1[01]\d)\s*(?:yo|y/o|year[- ]old)\b"]))
            .with_pattern(
                PatternRule::new("ct_head", [r"\bCT\s+head\b"]).with_sources([SourceType::Imaging]),
            )
            .with_pattern(PatternRule::treatment("hip_surgery", [r"hemiarthroplasty", r"\bORIF\b"]))
            .with_pattern(PatternRule::new("gcs", [r"\bGCS\s*:?\s*(\d+(?:\.\d+)?)"]))
            .with_definition(definition);
        CompiledRuleSet::compile(&doc, &EngineConfig::default()).unwrap()
    }

    fn at(hours: i64) -> BlockTimestamp {
        BlockTimestamp::At(t0() + Duration::hours(hours))
    }

    fn corpus(blocks: Vec<EvidenceBlock>) -> EvidenceCorpus {
        EvidenceCorpus::new("P1", Some(t0()), blocks)
    }

    fn run(gate: Gate, corpus: &EvidenceCorpus) -> GateResult {
        let rules = rules(vec![gate.clone()]);
        evaluate_gate(&EvaluationContext::new(&rules, corpus), &gate)
    }

    #[test]
    fn test_clean_positive() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(0),
            "HPI: 80 yo male with ground level fall",
        )]);
        let result = run(Gate::trigger("age", ["elderly"]), &corpus);
        assert_eq!(result.outcome, GateOutcome::Matched);
        assert_eq!(result.match_details.len(), 1);
        let detail = &result.match_details[0];
        assert_eq!(detail.matched_text, "80 yo");
        assert!(detail.accepted);
        assert!(!detail.is_historical);
        assert!(detail.surrounding_context.contains("ground level fall"));
    }

    #[test]
    fn test_historical_only_is_rejected() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(0),
            "Past Surgical History:\n- R hip fracture repair\nAllergies: none",
        )]);
        let result = run(Gate::trigger("fx", ["hip_fx"]), &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(
            result.reason,
            GateReason::EvidenceRejected {
                historical: 1,
                negated: 0,
                outside_window: 0
            }
        );
        assert!(result.match_details[0].is_historical);
        assert!(!result.match_details[0].accepted);
    }

    #[test]
    fn test_allow_historical() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(0),
            "PMH: hip fracture",
        )]);
        let result = run(Gate::trigger("fx", ["hip_fx"]).allow_historical(), &corpus);
        assert_eq!(result.outcome, GateOutcome::Matched);
        assert!(result.match_details[0].is_historical);
    }

    #[test]
    fn test_negated_hit() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::Imaging,
            at(1),
            "XR pelvis: no evidence of hip fracture.",
        )]);
        let result = run(Gate::trigger("fx", ["hip_fx"]), &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert!(result.match_details[0].is_negated);
        assert!(result.explanation.contains("1 negated"));

        let result = run(Gate::trigger("fx", ["hip_fx"]).ignore_negation(), &corpus);
        assert_eq!(result.outcome, GateOutcome::Matched);
    }

    #[test]
    fn test_missing_source_is_indeterminate() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::PhysicianNote,
            at(0),
            "CT head ordered",
        )]);
        let result = run(Gate::new("ct", GateKind::EvidenceAny, ["ct_head"]), &corpus);
        assert_eq!(result.outcome, GateOutcome::Indeterminate);
        assert_eq!(
            result.reason,
            GateReason::SourceTypeAbsent {
                source_types: vec![SourceType::Imaging]
            }
        );
    }

    #[test]
    fn test_window_rejects_late_evidence() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(30),
            "Left hip fracture",
        )]);
        let gate = Gate::trigger("fx", ["hip_fx"]).with_window(AdmissionWindow::hours(24));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(result.match_details[0].window, WindowStatus::AfterWindow);
        assert!(result.explanation.contains("outside the admission window"));
    }

    #[test]
    fn test_undated_evidence_in_window_is_indeterminate() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            BlockTimestamp::Malformed("13/45/25 9999".into()),
            "Left hip fracture",
        )]);
        let gate = Gate::trigger("fx", ["hip_fx"]).with_window(AdmissionWindow::hours(24));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::Indeterminate);
        assert_eq!(
            result.reason,
            GateReason::EvidenceUndated {
                missing: 0,
                malformed: 1
            }
        );
    }

    #[test]
    fn test_window_without_reference_is_indeterminate() {
        let corpus = EvidenceCorpus::new(
            "P1",
            None,
            vec![EvidenceBlock::new(SourceType::TraumaHp, at(0), "hip fracture")],
        );
        let gate = Gate::trigger("fx", ["hip_fx"]).with_window(AdmissionWindow::hours(24));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::Indeterminate);
        assert_eq!(result.reason, GateReason::ReferenceTimeUnavailable);
    }

    #[test]
    fn test_min_count() {
        let corpus = corpus(vec![
            EvidenceBlock::new(SourceType::TraumaHp, at(0), "hip fracture"),
            EvidenceBlock::new(SourceType::Imaging, at(1), "hip fracture"),
        ]);
        let result = run(Gate::trigger("fx", ["hip_fx"]).with_min_count(3), &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(
            result.reason,
            GateReason::BelowMinimumCount {
                found: 2,
                required: 3
            }
        );
    }

    #[test]
    fn test_evidence_all() {
        let gate = Gate::new("both", GateKind::EvidenceAll, ["elderly", "hip_fx"]);
        let partial = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(0),
            "82 year-old female",
        )]);
        let result = run(gate.clone(), &partial);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(
            result.reason,
            GateReason::PatternsMissing {
                pattern_keys: vec!["hip_fx".to_string()]
            }
        );

        let full = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(0),
            "82 year-old female with left hip fracture",
        )]);
        assert_eq!(run(gate, &full).outcome, GateOutcome::Matched);
    }

    #[test]
    fn test_evidence_all_absent_source_is_indeterminate() {
        let gate = Gate::new("both", GateKind::EvidenceAll, ["elderly", "ct_head"]);
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(0),
            "82 yo with CT head pending",
        )]);
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::Indeterminate);
        assert!(matches!(result.reason, GateReason::SourceTypeAbsent { .. }));
    }

    #[test]
    fn test_timing_late() {
        let corpus = corpus(vec![
            EvidenceBlock::new(SourceType::TraumaHp, at(0), "Left hip fracture"),
            EvidenceBlock::new(
                SourceType::OperativeNote,
                at(51),
                "Left hip hemiarthroplasty performed",
            ),
        ]);
        let gate = Gate::timing_after_arrival("surgery", "hip_surgery", TimingConstraint::hours(48));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(result.reason, GateReason::TimingNotMet);
        let report = result.timing.unwrap();
        assert_eq!(report.constraint, "48h");
        assert_eq!(report.reference_time, t0());
        assert_eq!(report.earliest_late_timestamp, Some(t0() + Duration::hours(51)));
        assert!(result.explanation.contains("48h"));
        assert!(result.explanation.contains("2025-03-03 13:00"));
        assert!(result.explanation.contains("51h after arrival"));
    }

    #[test]
    fn test_timing_in_time() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::OperativeNote,
            at(20),
            "ORIF left hip",
        )]);
        let gate = Gate::timing_after_arrival("surgery", "hip_surgery", TimingConstraint::hours(48));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::Matched);
        assert_eq!(
            result.timing.unwrap().qualifying_timestamp,
            Some(t0() + Duration::hours(20))
        );
    }

    #[test]
    fn test_timing_explains_evidence_before_arrival() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::OperativeNote,
            at(-2),
            "ORIF left hip",
        )]);
        let gate = Gate::timing_after_arrival("surgery", "hip_surgery", TimingConstraint::hours(48));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::Matched);
        assert!(result.explanation.contains("2h before arrival"));
    }

    #[test]
    fn test_timing_deadline_past_calendar_end_is_indeterminate() {
        let reference = NaiveDateTime::MAX - Duration::hours(1);
        let corpus = EvidenceCorpus::new(
            "P1",
            Some(reference),
            vec![EvidenceBlock::new(
                SourceType::OperativeNote,
                BlockTimestamp::At(reference),
                "ORIF left hip",
            )],
        );
        let gate = Gate::timing_after_arrival("surgery", "hip_surgery", TimingConstraint::hours(48));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::Indeterminate);
        assert_eq!(result.reason, GateReason::WindowOutOfRange);
        assert!(result.timing.is_none());
    }

    #[test]
    fn test_window_past_calendar_end_is_indeterminate() {
        let reference = NaiveDateTime::MAX - Duration::hours(1);
        let corpus = EvidenceCorpus::new(
            "P1",
            Some(reference),
            vec![EvidenceBlock::new(
                SourceType::TraumaHp,
                BlockTimestamp::At(reference),
                "hip fracture",
            )],
        );
        let gate = Gate::trigger("fx", ["hip_fx"]).with_window(AdmissionWindow::hours(24));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::Indeterminate);
        assert_eq!(result.reason, GateReason::WindowOutOfRange);
        assert_eq!(result.match_details[0].window, WindowStatus::Unresolvable);
        assert!(!result.match_details[0].accepted);
    }

    fn gcs_at_most(value: i64) -> Gate {
        Gate::numeric_threshold(
            "gcs",
            "gcs",
            NumericThreshold::new(ComparisonOp::Le, Decimal::from(value)),
        )
        .with_role(GateRole::Trigger)
    }

    #[rstest]
    #[case::met("Neuro: GCS 7, pupils equal", GateOutcome::Matched)]
    #[case::met_on_boundary("GCS: 8", GateOutcome::Matched)]
    #[case::met_after_a_higher_score("GCS 14 on scene, GCS 6 on arrival", GateOutcome::Matched)]
    #[case::not_met("GCS 14", GateOutcome::NotMatched)]
    #[case::no_value("GCS not assessed, patient intubated", GateOutcome::Indeterminate)]
    #[case::no_mention("Alert and oriented", GateOutcome::Indeterminate)]
    fn test_threshold_outcomes(#[case] text: &str, #[case] expected: GateOutcome) {
        let corpus = corpus(vec![EvidenceBlock::new(SourceType::TraumaHp, at(0), text)]);
        assert_eq!(run(gcs_at_most(8), &corpus).outcome, expected);
    }

    #[test]
    fn test_threshold_not_met_lists_observed_values() {
        let corpus = corpus(vec![
            EvidenceBlock::new(SourceType::TraumaHp, at(0), "GCS 14"),
            EvidenceBlock::new(SourceType::PhysicianNote, at(2), "repeat GCS 15"),
        ]);
        let result = run(gcs_at_most(8), &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(
            result.reason,
            GateReason::ThresholdNotMet {
                condition: "<= 8".to_string(),
                observed: vec![Decimal::from(14), Decimal::from(15)],
            }
        );
        assert_eq!(result.match_details[0].value, Some(Decimal::from(14)));
        assert!(!result.match_details[0].accepted);
        assert!(result.explanation.contains("14, 15"));
    }

    #[test]
    fn test_threshold_match_reports_value() {
        let corpus = corpus(vec![EvidenceBlock::new(SourceType::TraumaHp, at(0), "GCS 6")]);
        let result = run(gcs_at_most(8), &corpus);
        assert_eq!(result.reason, GateReason::Satisfied);
        let detail = result.accepted_details().next().unwrap();
        assert_eq!(detail.value, Some(Decimal::from(6)));
        assert!(result.explanation.contains("value 6 meets <= 8"));
    }

    #[test]
    fn test_threshold_ignores_historical_values() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::TraumaHp,
            at(0),
            "Past Medical History:\n- TBI 2019, GCS 5\nAllergies: none",
        )]);
        let result = run(gcs_at_most(8), &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert!(matches!(result.reason, GateReason::EvidenceRejected { historical: 1, .. }));
    }

    #[test]
    fn test_timing_without_evidence_reports_last_timestamp() {
        let corpus = corpus(vec![EvidenceBlock::new(
            SourceType::NursingNote,
            at(70),
            "Resting comfortably",
        )]);
        let gate = Gate::timing_after_arrival("surgery", "hip_surgery", TimingConstraint::hours(48));
        let result = run(gate, &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(result.reason, GateReason::NoEvidence);
        assert!(result.explanation.contains("no qualifying evidence found"));
        assert!(result.explanation.contains("2025-03-04 08:00"));
    }

    #[test]
    fn test_exclusion_wording() {
        let corpus = corpus(vec![EvidenceBlock::new(SourceType::TraumaHp, at(0), "stable")]);
        let result = run(Gate::exclusion("x", ["hip_fx"]), &corpus);
        assert_eq!(result.outcome, GateOutcome::NotMatched);
        assert_eq!(result.explanation, "no exclusion criteria found");
    }

    #[test]
    fn test_fail_disposition() {
        let gate = Gate::new("doc", GateKind::EvidenceAny, ["hip_fx"])
            .on_fail(FailDisposition::Indeterminate);
        let corpus = corpus(vec![EvidenceBlock::new(SourceType::TraumaHp, at(0), "stable")]);
        let result = apply_fail_disposition(&gate, run(gate.clone(), &corpus));
        assert_eq!(result.outcome, GateOutcome::Indeterminate);
        assert!(result.explanation.starts_with("documentation not found"));
    }

    #[test]
    fn test_detail_cap_keeps_accepted_evidence() {
        let mut blocks: Vec<EvidenceBlock> = (0..12)
            .map(|i| EvidenceBlock::new(SourceType::TraumaHp, at(i), "PMH: hip fracture"))
            .collect();
        blocks.push(EvidenceBlock::new(SourceType::TraumaHp, at(13), "Acute hip fracture"));
        let corpus = corpus(blocks);
        let result = run(Gate::trigger("fx", ["hip_fx"]), &corpus);
        assert_eq!(result.outcome, GateOutcome::Matched);
        assert_eq!(result.match_details.len(), 9);
        assert_eq!(result.accepted_details().count(), 1);
    }

    #[test]
    fn test_near_misses_ignore_filters() {
        let corpus = corpus(vec![
            EvidenceBlock::new(SourceType::TraumaHp, at(0), "PMH: hip fracture"),
            EvidenceBlock::new(SourceType::Imaging, at(1), "no hip fracture"),
        ]);
        let gate = Gate::trigger("fx", ["hip_fx"]);
        let rules = rules(vec![]);
        let misses = near_misses(&EvaluationContext::new(&rules, &corpus), &gate, 8);
        assert_eq!(misses.len(), 2);
        assert_eq!(misses[1].snippet, "no hip fracture");
    }

    #[test]
    fn test_relative_format() {
        assert_eq!(relative(Duration::hours(51)), "51h after");
        assert_eq!(relative(Duration::minutes(90)), "1h 30m after");
        assert_eq!(relative(Duration::minutes(45)), "45m after");
        assert_eq!(relative(Duration::zero()), "0m after");
        assert_eq!(relative(Duration::minutes(-90)), "1h 30m before");
        assert_eq!(relative(Duration::minutes(-45)), "45m before");
        assert_eq!(relative(Duration::hours(-2)), "2h before");
    }
}
