//! Gates: single testable requirements within a definition

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use trauma_gate_types::{FinalOutcome, GateKind, SourceType};

/// Whether a gate decides if the definition applies or checks compliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRole {
    Trigger,
    #[default]
    Requirement,
}

/// How a NOT_MATCHED requirement is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailDisposition {
    /// Absence is a violation
    #[default]
    Fail,
    /// Absence is missing documentation
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minutes,
    Hours,
}

/// Deadline for `timing_after_arrival`, measured from the reference time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimingConstraint {
    pub value: u32,
    pub unit: TimeUnit,
    /// Reject evidence timestamped before the reference time
    #[serde(default = "default_true")]
    pub not_before_reference: bool,
}

impl TimingConstraint {
    pub const fn hours(value: u32) -> Self {
        Self {
            value,
            unit: TimeUnit::Hours,
            not_before_reference: true,
        }
    }

    pub const fn minutes(value: u32) -> Self {
        Self {
            value,
            unit: TimeUnit::Minutes,
            not_before_reference: true,
        }
    }

    pub const fn total_minutes(&self) -> i64 {
        match self.unit {
            TimeUnit::Minutes => self.value as i64,
            TimeUnit::Hours => self.value as i64 * 60,
        }
    }
}

impl fmt::Display for TimingConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            TimeUnit::Minutes => write!(f, "{}m", self.value),
            TimeUnit::Hours => write!(f, "{}h", self.value),
        }
    }
}

/// Comparison applied by a numeric threshold gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl ComparisonOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    pub fn holds(&self, value: Decimal, threshold: Decimal) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition a captured value must meet, e.g. `<= 8` for a GCS trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumericThreshold {
    pub operator: ComparisonOp,
    pub value: Decimal,
}

impl NumericThreshold {
    pub const fn new(operator: ComparisonOp, value: Decimal) -> Self {
        Self { operator, value }
    }

    pub fn is_met_by(&self, observed: Decimal) -> bool {
        self.operator.holds(observed, self.value)
    }
}

impl fmt::Display for NumericThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operator, self.value)
    }
}

/// Admissible time span around the reference event.
///
/// Unset fields fall back to the corpus reference time and the engine's
/// configured default window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AdmissionWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<chrono::NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_hours: Option<u32>,
}

impl AdmissionWindow {
    /// Window of the given width after the corpus reference time
    pub const fn hours(window_hours: u32) -> Self {
        Self {
            reference_time: None,
            window_hours: Some(window_hours),
            lookback_hours: None,
        }
    }

    pub const fn with_lookback(mut self, lookback_hours: u32) -> Self {
        self.lookback_hours = Some(lookback_hours);
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_min_count() -> usize {
    1
}

/// A single gate.
///
/// Defaults: requirement role, required, negation aware, historical
/// evidence rejected, one accepted match needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub gate_id: String,
    pub kind: GateKind,
    pub pattern_keys: Vec<String>,
    #[serde(default)]
    pub role: GateRole,
    #[serde(default = "default_true")]
    pub required: bool,
    /// Folded into the verdict even when the definition is not triggered
    #[serde(default)]
    pub reportable: bool,
    #[serde(default)]
    pub allow_historical: bool,
    #[serde(default = "default_true")]
    pub negation_aware: bool,
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    /// Overrides the source scope derived from the referenced patterns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_types: Option<Vec<SourceType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<NumericThreshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_window: Option<AdmissionWindow>,
    #[serde(default)]
    pub on_fail: FailDisposition,
    /// Verdict to return immediately when this gate matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_outcome: Option<FinalOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
}

impl Gate {
    pub fn new<I, S>(gate_id: impl Into<String>, kind: GateKind, pattern_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            gate_id: gate_id.into(),
            kind,
            pattern_keys: pattern_keys.into_iter().map(Into::into).collect(),
            role: GateRole::Requirement,
            required: true,
            reportable: false,
            allow_historical: false,
            negation_aware: true,
            min_count: 1,
            source_types: None,
            timing: None,
            threshold: None,
            admission_window: None,
            on_fail: FailDisposition::Fail,
            pass_outcome: None,
            fail_reason: None,
        }
    }

    /// An `evidence_any` trigger gate
    pub fn trigger<I, S>(gate_id: impl Into<String>, pattern_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(gate_id, GateKind::EvidenceAny, pattern_keys).with_role(GateRole::Trigger)
    }

    pub fn exclusion<I, S>(gate_id: impl Into<String>, pattern_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(gate_id, GateKind::Exclusion, pattern_keys)
    }

    /// A `timing_after_arrival` requirement on a single pattern
    pub fn timing_after_arrival(
        gate_id: impl Into<String>,
        pattern_key: impl Into<String>,
        constraint: TimingConstraint,
    ) -> Self {
        let mut gate = Self::new(gate_id, GateKind::TimingAfterArrival, [pattern_key.into()]);
        gate.timing = Some(constraint);
        gate
    }

    /// A `numeric_threshold` gate on a single capturing pattern
    pub fn numeric_threshold(
        gate_id: impl Into<String>,
        pattern_key: impl Into<String>,
        threshold: NumericThreshold,
    ) -> Self {
        let mut gate = Self::new(gate_id, GateKind::NumericThreshold, [pattern_key.into()]);
        gate.threshold = Some(threshold);
        gate
    }

    pub fn with_role(mut self, role: GateRole) -> Self {
        self.role = role;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn reportable(mut self) -> Self {
        self.reportable = true;
        self
    }

    pub fn allow_historical(mut self) -> Self {
        self.allow_historical = true;
        self
    }

    pub fn ignore_negation(mut self) -> Self {
        self.negation_aware = false;
        self
    }

    pub fn with_min_count(mut self, min_count: usize) -> Self {
        self.min_count = min_count;
        self
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = SourceType>) -> Self {
        self.source_types = Some(sources.into_iter().collect());
        self
    }

    pub fn with_window(mut self, window: AdmissionWindow) -> Self {
        self.admission_window = Some(window);
        self
    }

    pub fn on_fail(mut self, disposition: FailDisposition) -> Self {
        self.on_fail = disposition;
        self
    }

    pub fn with_pass_outcome(mut self, outcome: FinalOutcome) -> Self {
        self.pass_outcome = Some(outcome);
        self
    }

    pub fn with_fail_reason(mut self, reason: impl Into<String>) -> Self {
        self.fail_reason = Some(reason.into());
        self
    }

    pub fn is_trigger(&self) -> bool {
        self.role == GateRole::Trigger && self.kind != GateKind::Exclusion
    }

    pub fn is_exclusion(&self) -> bool {
        self.kind == GateKind::Exclusion
    }
}
