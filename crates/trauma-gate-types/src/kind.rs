//! Closed sets of gate and definition kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// The evaluation strategy of a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    EvidenceAny,
    EvidenceAll,
    RequiresTreatmentAny,
    TimingAfterArrival,
    /// A value captured from the text compared against a threshold
    NumericThreshold,
    Exclusion,
}

impl GateKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EvidenceAny => "evidence_any",
            Self::EvidenceAll => "evidence_all",
            Self::RequiresTreatmentAny => "requires_treatment_any",
            Self::TimingAfterArrival => "timing_after_arrival",
            Self::NumericThreshold => "numeric_threshold",
            Self::Exclusion => "exclusion",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocols report compliance; NTDS events report presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Protocol,
    Event,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol => f.write_str("protocol"),
            Self::Event => f.write_str("event"),
        }
    }
}
