//! Gate and definition results

use crate::{BlockRef, DefinitionKind, GateKind, MatchDetail, SourceType};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use trauma_gate_diagnostics::{ErrorCode, TG0100, TG0101, TG0102, TG0103, TG0104, TG0105};

/// Three-valued outcome of a single gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateOutcome {
    Matched,
    NotMatched,
    Indeterminate,
}

impl fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Matched => "MATCHED",
            Self::NotMatched => "NOT_MATCHED",
            Self::Indeterminate => "INDETERMINATE",
        })
    }
}

/// Structured cause of a gate outcome.
///
/// Every non-passing outcome names one of these so that "nothing found" can
/// be told apart from "found, but historical" or "could not look".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GateReason {
    Satisfied,
    /// No hit of any referenced pattern in the searchable blocks
    NoEvidence,
    /// Hits exist but every one was discarded
    EvidenceRejected {
        historical: usize,
        negated: usize,
        outside_window: usize,
    },
    BelowMinimumCount {
        found: usize,
        required: usize,
    },
    /// `evidence_all` keys without accepted evidence
    PatternsMissing { pattern_keys: Vec<String> },
    /// None of the source types the gate reads are present in the corpus
    SourceTypeAbsent { source_types: Vec<SourceType> },
    ReferenceTimeUnavailable,
    /// The only candidates left could not be placed in time
    EvidenceUndated { missing: usize, malformed: usize },
    TimingNotMet,
    /// Current values were found and none meets the threshold
    ThresholdNotMet {
        condition: String,
        observed: Vec<Decimal>,
    },
    /// No value for a numeric threshold was documented
    ValueNotDocumented,
    /// Window or deadline falls outside the representable date range
    WindowOutOfRange,
}

impl GateReason {
    /// Evidence condition code, for reasons that degrade a gate
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::SourceTypeAbsent { .. } => Some(TG0100),
            Self::ReferenceTimeUnavailable => Some(TG0101),
            Self::EvidenceUndated { malformed, .. } if *malformed > 0 => Some(TG0103),
            Self::EvidenceUndated { .. } => Some(TG0102),
            Self::ValueNotDocumented => Some(TG0104),
            Self::WindowOutOfRange => Some(TG0105),
            _ => None,
        }
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            Self::Satisfied => "requirement satisfied".to_string(),
            Self::NoEvidence => "no evidence found".to_string(),
            Self::EvidenceRejected {
                historical,
                negated,
                outside_window,
            } => {
                let mut parts = Vec::new();
                if *historical > 0 {
                    parts.push(format!("{} historical", historical));
                }
                if *negated > 0 {
                    parts.push(format!("{} negated", negated));
                }
                if *outside_window > 0 {
                    parts.push(format!("{} outside the admission window", outside_window));
                }
                format!("evidence found but not current ({})", parts.join(", "))
            }
            Self::BelowMinimumCount { found, required } => {
                format!("found {} qualifying match(es), {} required", found, required)
            }
            Self::PatternsMissing { pattern_keys } => {
                format!("no evidence for: {}", pattern_keys.join(", "))
            }
            Self::SourceTypeAbsent { source_types } if source_types.is_empty() => {
                "no evidence blocks in corpus".to_string()
            }
            Self::SourceTypeAbsent { source_types } => {
                let names: Vec<&str> = source_types.iter().map(SourceType::as_str).collect();
                format!("required source type absent: {}", names.join(", "))
            }
            Self::ReferenceTimeUnavailable => "reference time unavailable".to_string(),
            Self::EvidenceUndated { missing, malformed } => format!(
                "evidence cannot be placed in time ({} missing, {} malformed timestamp(s))",
                missing, malformed
            ),
            Self::TimingNotMet => "timing requirement not met".to_string(),
            Self::ThresholdNotMet {
                condition,
                observed,
            } => {
                let values: Vec<String> = observed.iter().map(Decimal::to_string).collect();
                format!(
                    "documented value(s) {} do not meet {}",
                    values.join(", "),
                    condition
                )
            }
            Self::ValueNotDocumented => "no value documented".to_string(),
            Self::WindowOutOfRange => {
                "time window cannot be computed from the reference time".to_string()
            }
        }
    }
}

/// Timing detail of a `timing_after_arrival` gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingReport {
    /// Constraint as written, e.g. "48h"
    pub constraint: String,
    pub reference_time: NaiveDateTime,
    pub deadline: NaiveDateTime,
    pub qualifying_timestamp: Option<NaiveDateTime>,
    pub earliest_late_timestamp: Option<NaiveDateTime>,
    pub earliest_early_timestamp: Option<NaiveDateTime>,
    pub last_evidence_timestamp: Option<NaiveDateTime>,
}

/// Result of evaluating one gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_id: String,
    pub kind: GateKind,
    pub outcome: GateOutcome,
    pub reason: GateReason,
    pub explanation: String,
    pub match_details: Vec<MatchDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingReport>,
}

impl GateResult {
    pub fn is_matched(&self) -> bool {
        self.outcome == GateOutcome::Matched
    }

    /// Details that count toward the outcome
    pub fn accepted_details(&self) -> impl Iterator<Item = &MatchDetail> {
        self.match_details.iter().filter(|d| d.accepted)
    }
}

/// Final verdict of a protocol or event definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalOutcome {
    Compliant,
    NonCompliant,
    NotTriggered,
    Indeterminate,
    Excluded,
    Yes,
    No,
    UnableToDetermine,
    NotEvaluated,
}

impl FinalOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "COMPLIANT",
            Self::NonCompliant => "NON_COMPLIANT",
            Self::NotTriggered => "NOT_TRIGGERED",
            Self::Indeterminate => "INDETERMINATE",
            Self::Excluded => "EXCLUDED",
            Self::Yes => "YES",
            Self::No => "NO",
            Self::UnableToDetermine => "UNABLE_TO_DETERMINE",
            Self::NotEvaluated => "NOT_EVALUATED",
        }
    }

    /// Passing, failing and undetermined verdicts for a definition kind
    pub const fn pass(kind: DefinitionKind) -> Self {
        match kind {
            DefinitionKind::Protocol => Self::Compliant,
            DefinitionKind::Event => Self::Yes,
        }
    }

    pub const fn fail(kind: DefinitionKind) -> Self {
        match kind {
            DefinitionKind::Protocol => Self::NonCompliant,
            DefinitionKind::Event => Self::No,
        }
    }

    pub const fn undetermined(kind: DefinitionKind) -> Self {
        match kind {
            DefinitionKind::Protocol => Self::Indeterminate,
            DefinitionKind::Event => Self::UnableToDetermine,
        }
    }

    pub const fn not_triggered(kind: DefinitionKind) -> Self {
        match kind {
            DefinitionKind::Protocol => Self::NotTriggered,
            DefinitionKind::Event => Self::No,
        }
    }

    /// Whether a gate may return this verdict directly for a definition kind.
    ///
    /// EXCLUDED comes only from exclusion gates and NOT_EVALUATED only from
    /// context-only definitions.
    pub const fn is_gate_outcome_for(&self, kind: DefinitionKind) -> bool {
        match kind {
            DefinitionKind::Protocol => matches!(
                self,
                Self::Compliant | Self::NonCompliant | Self::Indeterminate | Self::NotTriggered
            ),
            DefinitionKind::Event => matches!(self, Self::Yes | Self::No | Self::UnableToDetermine),
        }
    }
}

impl fmt::Display for FinalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unfiltered hit listed for a failed requirement.
///
/// Near misses are informational; they never change a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearMiss {
    pub block: BlockRef,
    pub source_type: SourceType,
    pub timestamp: Option<NaiveDateTime>,
    pub pattern_key: String,
    pub snippet: String,
}

/// Complete, immutable result of evaluating one definition for one patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolResult {
    pub patient_id: String,
    pub definition_id: String,
    pub definition_name: String,
    pub definition_version: String,
    pub rule_set_version: String,
    pub kind: DefinitionKind,
    pub final_outcome: FinalOutcome,
    pub gate_results: Vec<GateResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub near_misses: Vec<NearMiss>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl ProtocolResult {
    /// Result of the named gate, if it was evaluated
    pub fn gate(&self, gate_id: &str) -> Option<&GateResult> {
        self.gate_results.iter().find(|g| g.gate_id == gate_id)
    }

    /// Canonical JSON form; identical inputs give identical bytes
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
