//! Clinical documentation source categories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Source category of an evidence block, as tagged by ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    TraumaHp,
    EdNote,
    PhysicianNote,
    ConsultNote,
    NursingNote,
    ProgressNote,
    Imaging,
    Radiology,
    Lab,
    /// Medication administration record
    Mar,
    OperativeNote,
    Procedure,
    Discharge,
    Unknown,
}

impl SourceType {
    /// All source types in declaration order
    pub const ALL: [SourceType; 14] = [
        SourceType::TraumaHp,
        SourceType::EdNote,
        SourceType::PhysicianNote,
        SourceType::ConsultNote,
        SourceType::NursingNote,
        SourceType::ProgressNote,
        SourceType::Imaging,
        SourceType::Radiology,
        SourceType::Lab,
        SourceType::Mar,
        SourceType::OperativeNote,
        SourceType::Procedure,
        SourceType::Discharge,
        SourceType::Unknown,
    ];

    /// The upper-case label used in rule files and exports
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TraumaHp => "TRAUMA_HP",
            Self::EdNote => "ED_NOTE",
            Self::PhysicianNote => "PHYSICIAN_NOTE",
            Self::ConsultNote => "CONSULT_NOTE",
            Self::NursingNote => "NURSING_NOTE",
            Self::ProgressNote => "PROGRESS_NOTE",
            Self::Imaging => "IMAGING",
            Self::Radiology => "RADIOLOGY",
            Self::Lab => "LAB",
            Self::Mar => "MAR",
            Self::OperativeNote => "OPERATIVE_NOTE",
            Self::Procedure => "PROCEDURE",
            Self::Discharge => "DISCHARGE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a source label is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source type '{0}'")]
pub struct UnknownSourceType(pub String);

impl FromStr for SourceType {
    type Err = UnknownSourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == label)
            .ok_or_else(|| UnknownSourceType(s.to_string()))
    }
}
