//! Match provenance

use crate::{BlockRef, SourceType};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trauma_gate_diagnostics::Span;

/// Where a block's timestamp falls relative to a gate's admission window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowStatus {
    /// The gate has no admission window
    Unconstrained,
    Eligible,
    BeforeWindow,
    AfterWindow,
    /// Missing or malformed timestamp under a windowed gate
    Undated,
    /// Windowed gate with no reference time to anchor it
    NoReference,
    /// Window bounds fall outside the representable date range
    Unresolvable,
}

impl WindowStatus {
    /// Whether a candidate with this status may satisfy a gate
    pub const fn admits(&self) -> bool {
        matches!(self, Self::Unconstrained | Self::Eligible)
    }

    pub const fn is_out_of_window(&self) -> bool {
        matches!(self, Self::BeforeWindow | Self::AfterWindow)
    }
}

/// One recorded pattern hit, accepted or not.
///
/// Discarded hits are kept so that a non-passing gate can say what it saw
/// and why it was not enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub pattern_key: String,
    pub matched_text: String,
    pub surrounding_context: String,
    pub block: BlockRef,
    pub source_type: SourceType,
    pub timestamp: Option<NaiveDateTime>,
    pub span: Span,
    pub is_historical: bool,
    pub is_negated: bool,
    pub window: WindowStatus,
    pub accepted: bool,
    /// Value captured by a numeric threshold pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
}

/// Why a recorded hit did not count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Historical,
    Negated,
    OutsideWindow,
    Undated,
    NoReference,
    UnresolvableWindow,
    /// Captured value does not meet the gate threshold
    OffThreshold,
}

impl MatchDetail {
    /// The first reason this hit was rejected, in precedence order
    pub fn rejection(&self) -> Option<Rejection> {
        if self.accepted {
            None
        } else if self.is_historical {
            Some(Rejection::Historical)
        } else if self.is_negated {
            Some(Rejection::Negated)
        } else if self.window.is_out_of_window() {
            Some(Rejection::OutsideWindow)
        } else if self.window == WindowStatus::NoReference {
            Some(Rejection::NoReference)
        } else if self.window == WindowStatus::Unresolvable {
            Some(Rejection::UnresolvableWindow)
        } else if self.window == WindowStatus::Undated {
            Some(Rejection::Undated)
        } else {
            Some(Rejection::OffThreshold)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(accepted: bool, historical: bool, negated: bool, window: WindowStatus) -> MatchDetail {
        MatchDetail {
            pattern_key: "k".into(),
            matched_text: "hip fracture".into(),
            surrounding_context: "hip fracture".into(),
            block: BlockRef(0),
            source_type: SourceType::TraumaHp,
            timestamp: None,
            span: Span::new(0, 12),
            is_historical: historical,
            is_negated: negated,
            window,
            accepted,
            value: None,
        }
    }

    #[test]
    fn test_rejection_precedence() {
        assert_eq!(detail(true, false, false, WindowStatus::Eligible).rejection(), None);
        assert_eq!(
            detail(false, true, true, WindowStatus::AfterWindow).rejection(),
            Some(Rejection::Historical)
        );
        assert_eq!(
            detail(false, false, true, WindowStatus::AfterWindow).rejection(),
            Some(Rejection::Negated)
        );
        assert_eq!(
            detail(false, false, false, WindowStatus::BeforeWindow).rejection(),
            Some(Rejection::OutsideWindow)
        );
        assert_eq!(
            detail(false, false, false, WindowStatus::Undated).rejection(),
            Some(Rejection::Undated)
        );
        let mut low_gcs = detail(false, false, false, WindowStatus::Unconstrained);
        low_gcs.value = Some(Decimal::new(12, 0));
        assert_eq!(low_gcs.rejection(), Some(Rejection::OffThreshold));
    }

    #[test]
    fn test_window_admits() {
        assert!(WindowStatus::Unconstrained.admits());
        assert!(WindowStatus::Eligible.admits());
        assert!(!WindowStatus::NoReference.admits());
        assert!(!WindowStatus::AfterWindow.admits());
    }
}
