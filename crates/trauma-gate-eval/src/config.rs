//! Engine configuration
//!
//! Every policy constant the engine applies lives here with its default.
//! Configuration is plain data and loads from JSON; any field left out keeps
//! its default.

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};

/// Characters scanned before a match for section headers
pub const DEFAULT_HISTORY_LOOKBACK_CHARS: usize = 400;
/// Characters scanned on each side of a match for inline historical markers
pub const DEFAULT_INLINE_WINDOW_CHARS: usize = 100;
pub const DEFAULT_WINDOW_HOURS: u32 = 24;
pub const DEFAULT_NEGATION_PRE_CHARS: usize = 30;
pub const DEFAULT_NEGATION_POST_CHARS: usize = 20;
pub const DEFAULT_SNIPPET_CHARS: usize = 100;
pub const DEFAULT_MAX_DETAILS_PER_PATTERN: usize = 8;
pub const DEFAULT_MAX_NEAR_MISSES: usize = 8;
/// Upper bound on any window, lookback or deadline, about five years
pub const MAX_SPAN_HOURS: u32 = 5 * 366 * 24;

/// Tunable engine policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub history_lookback_chars: usize,
    pub inline_window_chars: usize,
    /// Admission window width when a gate does not give one
    pub default_window_hours: u32,
    /// Pre-arrival allowance when a gate does not give one
    pub default_lookback_hours: u32,
    pub negation_pre_chars: usize,
    pub negation_post_chars: usize,
    /// Context captured on each side of a match for reporting
    pub snippet_chars: usize,
    /// Cap on recorded accepted, and separately rejected, details per pattern
    pub max_details_per_pattern: usize,
    pub max_near_misses: usize,
    pub classifier: ClassifierTables,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_lookback_chars: DEFAULT_HISTORY_LOOKBACK_CHARS,
            inline_window_chars: DEFAULT_INLINE_WINDOW_CHARS,
            default_window_hours: DEFAULT_WINDOW_HOURS,
            default_lookback_hours: 0,
            negation_pre_chars: DEFAULT_NEGATION_PRE_CHARS,
            negation_post_chars: DEFAULT_NEGATION_POST_CHARS,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
            max_details_per_pattern: DEFAULT_MAX_DETAILS_PER_PATTERN,
            max_near_misses: DEFAULT_MAX_NEAR_MISSES,
            classifier: ClassifierTables::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> EvalResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EvalError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject window defaults beyond `MAX_SPAN_HOURS`
    pub fn validate(&self) -> EvalResult<()> {
        for (name, hours) in [
            ("default_window_hours", self.default_window_hours),
            ("default_lookback_hours", self.default_lookback_hours),
        ] {
            if hours > MAX_SPAN_HOURS {
                return Err(EvalError::invalid_config(format!(
                    "{name} of {hours}h exceeds the {MAX_SPAN_HOURS}h limit"
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> EvalResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EvalError::invalid_config(e.to_string()))
    }
}

const HISTORY_SECTION_MARKERS: &[&str] = &[
    "past medical history",
    "past surgical history",
    "pmh:",
    "psh:",
    "surgical history:",
    "medical history:",
    "family history",
    "family hx",
    "fhx:",
    "social history",
    "previous surgeries",
    "prior procedures",
    "prior surgeries",
    "surgical hx",
    "medical hx",
];

const CURRENT_SECTION_HEADERS: &[&str] = &[
    "assessment",
    "plan",
    "physical exam",
    "pe:",
    "review of systems",
    "ros:",
    "hpi:",
    "subjective",
    "objective",
    "imaging",
    "labs",
    "radiograph",
    "impression",
    "secondary survey",
    "primary survey",
    "chief complaint",
    "medications:",
    "allergies:",
];

const CURRENT_SECTION_PHRASES: &[&str] = &["history of present illness", "hpi:"];

const INLINE_HISTORICAL_MARKERS: &[&str] = &[
    "history of",
    "hx of",
    "previous",
    "prior ",
    "remote history",
    "old fracture",
    "healed fracture",
    "status post",
    "s/p ",
];

const DATE_RELATIVE_PATTERN: &str = r"\b\d+\s+(?:weeks?|months?|years?)\s+(?:ago|prior)\b";

const PAST_PROCEDURE_PATTERN: &str =
    r"\b(?:underwent|had|received|completed)\b.*\b(?:surgery|repair|fixation|replacement|procedure)\b";

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Marker tables used by the context classifier.
///
/// Marker strings match case-insensitively as plain substrings. The two
/// pattern fields are regular expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierTables {
    /// Section headers that open a historical narrative
    pub history_section_markers: Vec<String>,
    /// Section headers that close one, recognised at the start of a line
    pub current_section_headers: Vec<String>,
    /// Current-admission phrases recognised anywhere; masked before the
    /// inline scan
    pub current_section_phrases: Vec<String>,
    pub inline_historical_markers: Vec<String>,
    pub date_relative_pattern: String,
    pub past_procedure_pattern: String,
}

impl Default for ClassifierTables {
    fn default() -> Self {
        Self {
            history_section_markers: owned(HISTORY_SECTION_MARKERS),
            current_section_headers: owned(CURRENT_SECTION_HEADERS),
            current_section_phrases: owned(CURRENT_SECTION_PHRASES),
            inline_historical_markers: owned(INLINE_HISTORICAL_MARKERS),
            date_relative_pattern: DATE_RELATIVE_PATTERN.to_string(),
            past_procedure_pattern: PAST_PROCEDURE_PATTERN.to_string(),
        }
    }
}
