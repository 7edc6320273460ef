//! Temporal window filter
//!
//! Places a block timestamp relative to a gate's admission window. The
//! window is closed on both ends: `[reference - lookback, reference + window]`.

use chrono::{Duration, NaiveDateTime};
use trauma_gate_rules::AdmissionWindow;
use trauma_gate_types::{BlockTimestamp, WindowStatus};

/// An admission window anchored to a concrete reference time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub reference: NaiveDateTime,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ResolvedWindow {
    /// `None` when either bound leaves the representable date range
    pub fn new(reference: NaiveDateTime, lookback_hours: u32, window_hours: u32) -> Option<Self> {
        Some(Self {
            reference,
            start: reference.checked_sub_signed(Duration::hours(i64::from(lookback_hours)))?,
            end: reference.checked_add_signed(Duration::hours(i64::from(window_hours)))?,
        })
    }

    pub fn classify(&self, at: NaiveDateTime) -> WindowStatus {
        if at < self.start {
            WindowStatus::BeforeWindow
        } else if at > self.end {
            WindowStatus::AfterWindow
        } else {
            WindowStatus::Eligible
        }
    }
}

/// The window a gate applies, after defaults are filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateWindow {
    /// No admission window; every timestamp passes
    Unconstrained,
    Anchored(ResolvedWindow),
    /// A window is required but there is nothing to anchor it to
    Unanchored,
    /// The window bounds cannot be computed from the reference time
    OutOfRange,
}

impl GateWindow {
    /// Resolve a gate's optional window against the corpus reference time
    pub fn resolve(
        window: Option<&AdmissionWindow>,
        corpus_reference: Option<NaiveDateTime>,
        default_window_hours: u32,
        default_lookback_hours: u32,
    ) -> Self {
        let Some(window) = window else {
            return Self::Unconstrained;
        };
        match window.reference_time.or(corpus_reference) {
            Some(reference) => ResolvedWindow::new(
                reference,
                window.lookback_hours.unwrap_or(default_lookback_hours),
                window.window_hours.unwrap_or(default_window_hours),
            )
            .map_or(Self::OutOfRange, Self::Anchored),
            None => Self::Unanchored,
        }
    }

    /// Classify a block timestamp against this window
    pub fn classify(&self, timestamp: &BlockTimestamp) -> WindowStatus {
        match self {
            Self::Unconstrained => WindowStatus::Unconstrained,
            Self::Unanchored => WindowStatus::NoReference,
            Self::OutOfRange => WindowStatus::Unresolvable,
            Self::Anchored(window) => match timestamp.datetime() {
                Some(at) => window.classify(at),
                None => WindowStatus::Undated,
            },
        }
    }
}
