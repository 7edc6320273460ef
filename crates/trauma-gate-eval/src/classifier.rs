//! Context classifier
//!
//! Decides whether a match describes the current admission or a historical
//! event. The decision is boolean and conservative: any historical signal
//! near the match wins.
//!
//! Three checks run in order:
//! 1. Section context. The look-back window before the match is searched for
//!    history section headers ("Past Surgical History", "PMH:"). A match under
//!    such a header is historical unless a current-admission header follows
//!    the history header before the match.
//! 2. Inline markers. The inline window before the match is searched for
//!    historical phrasing ("history of", "s/p "), and the rule's own
//!    historical exclusion regexes are run over the window around the match.
//!    Current-admission phrases are blanked out first so "History of Present
//!    Illness" never reads as "history of".
//! 3. Relative dates and past procedures ("3 months ago", "underwent ...
//!    repair") on either side of the match.

use crate::config::EngineConfig;
use regex::{Regex, RegexBuilder};
use trauma_gate_diagnostics::{RuleDefinitionError, Span};

/// Classifier compiled from marker tables
#[derive(Debug, Clone)]
pub struct ContextClassifier {
    history_markers: Vec<String>,
    /// Line-leading headers, stored with their leading newline
    current_headers: Vec<String>,
    current_phrases: Vec<String>,
    inline_markers: Vec<String>,
    date_relative: Regex,
    past_procedure: Regex,
    lookback_chars: usize,
    inline_chars: usize,
}

impl ContextClassifier {
    pub fn new(config: &EngineConfig) -> Result<Self, RuleDefinitionError> {
        let tables = &config.classifier;
        Ok(Self {
            history_markers: markers("history_section_markers", &tables.history_section_markers)?,
            current_headers: markers("current_section_headers", &tables.current_section_headers)?
                .into_iter()
                .map(|m| format!("\n{m}"))
                .collect(),
            current_phrases: markers("current_section_phrases", &tables.current_section_phrases)?,
            inline_markers: markers(
                "inline_historical_markers",
                &tables.inline_historical_markers,
            )?,
            date_relative: table_regex("date_relative_pattern", &tables.date_relative_pattern)?,
            past_procedure: table_regex("past_procedure_pattern", &tables.past_procedure_pattern)?,
            lookback_chars: config.history_lookback_chars,
            inline_chars: config.inline_window_chars,
        })
    }

    /// Whether the match at `span` sits in a historical context.
    ///
    /// `exclusions` are the matched pattern's historical exclusion regexes.
    pub fn is_historical(&self, text: &str, span: Span, exclusions: &[Regex]) -> bool {
        self.in_history_section(text, span)
            || self.has_inline_marker(text, span, exclusions)
            || self.has_past_phrasing(text, span)
    }

    fn in_history_section(&self, text: &str, span: Span) -> bool {
        let before = span
            .window_before(text, self.lookback_chars)
            .slice(text)
            .to_lowercase();
        let nearest = self
            .history_markers
            .iter()
            .filter_map(|m| before.rfind(m.as_str()).map(|pos| pos + m.len()))
            .max();
        match nearest {
            Some(end) => {
                let after = &before[end..];
                let left_history = self.current_headers.iter().any(|h| after.contains(h.as_str()))
                    || self.current_phrases.iter().any(|p| after.contains(p.as_str()));
                !left_history
            }
            None => false,
        }
    }

    fn has_inline_marker(&self, text: &str, span: Span, exclusions: &[Regex]) -> bool {
        let before = self.masked(span.window_before(text, self.inline_chars).slice(text));
        if self.inline_markers.iter().any(|m| before.contains(m.as_str())) {
            return true;
        }
        if exclusions.is_empty() {
            return false;
        }
        let around = self.masked(
            span.widen(text, self.inline_chars, self.inline_chars)
                .slice(text),
        );
        exclusions.iter().any(|re| re.is_match(&around))
    }

    fn has_past_phrasing(&self, text: &str, span: Span) -> bool {
        let before = self.masked(span.window_before(text, self.inline_chars).slice(text));
        let after = self.masked(span.window_after(text, self.inline_chars).slice(text));
        let near = format!("{before} {after}");
        self.date_relative.is_match(&near) || self.past_procedure.is_match(&near)
    }

    /// Lowercase `window` and blank out current-admission phrases
    fn masked(&self, window: &str) -> String {
        let mut lower = window.to_lowercase();
        for phrase in &self.current_phrases {
            if lower.contains(phrase.as_str()) {
                lower = lower.replace(phrase.as_str(), &" ".repeat(phrase.len()));
            }
        }
        lower
    }
}

fn markers(table: &str, entries: &[String]) -> Result<Vec<String>, RuleDefinitionError> {
    entries
        .iter()
        .map(|entry| {
            if entry.trim().is_empty() {
                Err(RuleDefinitionError::InvalidClassifierMarker {
                    table: table.to_string(),
                    marker: entry.clone(),
                    message: "marker is empty".to_string(),
                })
            } else {
                Ok(entry.to_lowercase())
            }
        })
        .collect()
}

fn table_regex(table: &str, pattern: &str) -> Result<Regex, RuleDefinitionError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| RuleDefinitionError::InvalidClassifierMarker {
            table: table.to_string(),
            marker: pattern.to_string(),
            message: e.to_string(),
        })
}
