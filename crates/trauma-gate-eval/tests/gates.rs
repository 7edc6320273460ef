//! Gate Evaluation Tests
//!
//! End-to-end gate behaviour through the engine:
//! - Historical classification of section and inline context
//! - Negation tagging
//! - Admission window boundaries
//! - Fail-closed handling of absent sources and undated evidence
//! - Required context keys

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use trauma_gate_eval::{EngineConfig, GateEngine};
use trauma_gate_rules::{AdmissionWindow, Definition, Gate, GateKind, PatternRule, RuleSetDocument};
use trauma_gate_types::{
    BlockTimestamp, EvidenceBlock, EvidenceCorpus, FinalOutcome, GateOutcome, GateReason,
    ProtocolResult, SourceType, WindowStatus,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 14)
        .unwrap()
        .and_hms_opt(22, 15, 0)
        .unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap()
}

fn patterns() -> RuleSetDocument {
    RuleSetDocument::new("test-1")
        .with_pattern(PatternRule::new(
            "femur_fx",
            [r"(?:femur|femoral)\s+(?:neck\s+)?fracture", r"intertrochanteric\s+fracture"],
        ))
        .with_pattern(
            PatternRule::new("ich", [r"subdural\s+hematoma", r"\bSDH\b"])
                .with_sources([SourceType::Imaging, SourceType::Radiology]),
        )
        .with_pattern(
            PatternRule::new("rib_fx", [r"rib\s+fractures?"]).with_exclusions([r"\bold\b", r"\bhealed\b"]),
        )
        .with_pattern(PatternRule::new("anticoag", [r"apixaban", r"warfarin", r"eliquis"]))
        .with_pattern(
            PatternRule::new("reversal", [r"andexxa", r"kcentra", r"\bPCC\b"])
                .with_context_keys(["anticoag"]),
        )
}

fn evaluate_gate(gate: Gate, blocks: Vec<EvidenceBlock>) -> ProtocolResult {
    let document = patterns().with_definition(
        Definition::protocol("T", "Test", "1")
            .with_gate(gate.with_role(trauma_gate_rules::GateRole::Trigger)),
    );
    let engine = GateEngine::new();
    let rules = engine.compile(&document).unwrap();
    let corpus = EvidenceCorpus::new("MRN-1", Some(t0()), blocks);
    engine.evaluate(&rules, "T", &corpus, now()).unwrap()
}

fn hp(text: &str) -> EvidenceBlock {
    EvidenceBlock::new(SourceType::TraumaHp, t0(), text)
}

fn outcome(result: &ProtocolResult) -> GateOutcome {
    result.gate_results[0].outcome
}

// ============================================================================
// Classification
// ============================================================================

#[rstest]
#[case("Past Surgical History:\n- L femur fracture repair 2019\n", GateOutcome::NotMatched)]
#[case("PMH: CAD, femoral neck fracture\n", GateOutcome::NotMatched)]
#[case("PMH: CAD\n\nAssessment:\nR femoral neck fracture", GateOutcome::Matched)]
#[case("HPI: fall from standing, R femur fracture on XR", GateOutcome::Matched)]
#[case("Pt with history of femur fracture, now R shoulder pain", GateOutcome::NotMatched)]
#[case("Femur fracture 2 years ago, healed", GateOutcome::NotMatched)]
#[case("R intertrochanteric fracture, displaced", GateOutcome::Matched)]
fn test_femur_classification(#[case] text: &str, #[case] expected: GateOutcome) {
    let result = evaluate_gate(Gate::new("fx", GateKind::EvidenceAny, ["femur_fx"]), vec![hp(text)]);
    assert_eq!(outcome(&result), expected, "{text:?}");
}

#[test]
fn test_rule_exclusions_mark_historical() {
    let result = evaluate_gate(
        Gate::new("rib", GateKind::EvidenceAny, ["rib_fx"]),
        vec![hp("CXR: old healed left rib fractures")],
    );
    assert_eq!(outcome(&result), GateOutcome::NotMatched);
    let detail = &result.gate_results[0].match_details[0];
    assert!(detail.is_historical);
    assert!(!detail.accepted);
}

#[test]
fn test_negated_match_is_recorded_not_accepted() {
    let result = evaluate_gate(
        Gate::new("fx", GateKind::EvidenceAny, ["femur_fx"]),
        vec![hp("XR R hip: negative for femoral neck fracture.")],
    );
    let gate = &result.gate_results[0];
    assert_eq!(gate.outcome, GateOutcome::NotMatched);
    assert_eq!(
        gate.reason,
        GateReason::EvidenceRejected {
            historical: 0,
            negated: 1,
            outside_window: 0
        }
    );
    assert!(gate.match_details[0].is_negated);
}

#[test]
fn test_negation_does_not_cross_clause() {
    let result = evaluate_gate(
        Gate::new("fx", GateKind::EvidenceAny, ["femur_fx"]),
        vec![hp("No pelvic injury; R femur fracture noted.")],
    );
    assert_eq!(outcome(&result), GateOutcome::Matched);
}

// ============================================================================
// Windows
// ============================================================================

#[rstest]
#[case(0, WindowStatus::Eligible)]
#[case(24 * 60, WindowStatus::Eligible)]
#[case(24 * 60 + 1, WindowStatus::AfterWindow)]
#[case(-1, WindowStatus::BeforeWindow)]
fn test_window_edges(#[case] offset_minutes: i64, #[case] expected: WindowStatus) {
    let block = EvidenceBlock::new(
        SourceType::PhysicianNote,
        t0() + Duration::minutes(offset_minutes),
        "R femur fracture",
    );
    let gate = Gate::new("fx", GateKind::EvidenceAny, ["femur_fx"]).with_window(AdmissionWindow::hours(24));
    let result = evaluate_gate(gate, vec![block]);
    let detail = &result.gate_results[0].match_details[0];
    assert_eq!(detail.window, expected);
    assert_eq!(detail.accepted, expected == WindowStatus::Eligible);
}

#[test]
fn test_lookback_admits_pre_arrival_notes() {
    let block = EvidenceBlock::new(
        SourceType::EdNote,
        t0() - Duration::hours(2),
        "Outside hospital XR: R femur fracture",
    );
    let gate = Gate::new("fx", GateKind::EvidenceAny, ["femur_fx"])
        .with_window(AdmissionWindow::hours(24).with_lookback(6));
    assert_eq!(outcome(&evaluate_gate(gate, vec![block])), GateOutcome::Matched);
}

#[test]
fn test_config_default_window_applies() {
    let document = patterns().with_definition(
        Definition::protocol("T", "Test", "1").with_gate(
            Gate::trigger("fx", ["femur_fx"]).with_window(AdmissionWindow {
                reference_time: None,
                window_hours: None,
                lookback_hours: None,
            }),
        ),
    );
    let block = EvidenceBlock::new(SourceType::TraumaHp, t0() + Duration::hours(48), "femur fracture");
    let corpus = EvidenceCorpus::new("MRN-1", Some(t0()), vec![block]);

    let narrow = GateEngine::new();
    let rules = narrow.compile(&document).unwrap();
    let result = narrow.evaluate(&rules, "T", &corpus, now()).unwrap();
    assert_eq!(result.gate_results[0].outcome, GateOutcome::NotMatched);

    let wide = GateEngine::with_config(EngineConfig {
        default_window_hours: 72,
        ..EngineConfig::default()
    });
    let rules = wide.compile(&document).unwrap();
    let result = wide.evaluate(&rules, "T", &corpus, now()).unwrap();
    assert_eq!(result.gate_results[0].outcome, GateOutcome::Matched);
}

// ============================================================================
// Fail-closed
// ============================================================================

#[test]
fn test_absent_imaging_is_indeterminate() {
    let result = evaluate_gate(
        Gate::new("ich", GateKind::EvidenceAny, ["ich"]),
        vec![hp("Concern for SDH, CT pending")],
    );
    let gate = &result.gate_results[0];
    assert_eq!(gate.outcome, GateOutcome::Indeterminate);
    assert_eq!(
        gate.reason,
        GateReason::SourceTypeAbsent {
            source_types: vec![SourceType::Imaging, SourceType::Radiology]
        }
    );
    assert_eq!(result.final_outcome, FinalOutcome::Indeterminate);
}

#[test]
fn test_present_imaging_without_hit_is_not_matched() {
    let imaging = EvidenceBlock::new(SourceType::Imaging, t0(), "CT head: no acute intracranial abnormality");
    let result = evaluate_gate(Gate::new("ich", GateKind::EvidenceAny, ["ich"]), vec![imaging]);
    assert_eq!(outcome(&result), GateOutcome::NotMatched);
    assert_eq!(result.gate_results[0].reason, GateReason::NoEvidence);
}

#[test]
fn test_missing_timestamp_in_window_is_indeterminate() {
    let block = EvidenceBlock::new(
        SourceType::TraumaHp,
        BlockTimestamp::parse(Some("sometime tuesday")),
        "R femur fracture",
    );
    let gate = Gate::new("fx", GateKind::EvidenceAny, ["femur_fx"]).with_window(AdmissionWindow::hours(24));
    let result = evaluate_gate(gate, vec![block]);
    let gate = &result.gate_results[0];
    assert_eq!(gate.outcome, GateOutcome::Indeterminate);
    assert_eq!(gate.reason.code().map(|c| c.to_string()), Some("TG0103".to_string()));
}

// ============================================================================
// Context keys
// ============================================================================

#[rstest]
#[case("Home apixaban. Kcentra given in trauma bay.", GateOutcome::Matched)]
#[case("Kcentra given in trauma bay.", GateOutcome::NotMatched)]
fn test_required_context_key(#[case] text: &str, #[case] expected: GateOutcome) {
    let result = evaluate_gate(Gate::new("rev", GateKind::EvidenceAny, ["reversal"]), vec![hp(text)]);
    assert_eq!(outcome(&result), expected);
}
