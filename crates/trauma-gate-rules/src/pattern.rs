//! Pattern rules

use serde::{Deserialize, Serialize};
use trauma_gate_types::SourceType;

/// What a pattern denotes clinically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternConcept {
    /// A diagnosis, finding or demographic fact
    #[default]
    Finding,
    /// An intervention that was performed (surgery, medication, consult)
    Treatment,
}

/// A named set of inclusion regexes.
///
/// Any inclusion regex may produce a candidate. `historical_exclusion`
/// regexes are consulted by the context classifier near each candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern_key: String,
    pub inclusion: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub historical_exclusion: Vec<String>,
    /// Other pattern keys, at least one of which must also hit the same block
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_context_keys: Vec<String>,
    /// Restricts scanning to these source types; `None` scans every block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicable_source_types: Option<Vec<SourceType>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub concept: PatternConcept,
}

impl PatternRule {
    /// Create a finding pattern from its inclusion regexes
    pub fn new<I, S>(pattern_key: impl Into<String>, inclusion: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern_key: pattern_key.into(),
            inclusion: inclusion.into_iter().map(Into::into).collect(),
            historical_exclusion: Vec::new(),
            required_context_keys: Vec::new(),
            applicable_source_types: None,
            description: String::new(),
            concept: PatternConcept::Finding,
        }
    }

    /// Create a treatment pattern from its inclusion regexes
    pub fn treatment<I, S>(pattern_key: impl Into<String>, inclusion: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            concept: PatternConcept::Treatment,
            ..Self::new(pattern_key, inclusion)
        }
    }

    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.historical_exclusion = exclusions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_context_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_context_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = SourceType>) -> Self {
        self.applicable_source_types = Some(sources.into_iter().collect());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_treatment(&self) -> bool {
        self.concept == PatternConcept::Treatment
    }

    /// Whether this pattern scans blocks of the given source type
    pub fn applies_to(&self, source_type: SourceType) -> bool {
        self.applicable_source_types
            .as_ref()
            .is_none_or(|sources| sources.contains(&source_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pattern_from_json_defaults() {
        let rule: PatternRule = serde_json::from_str(
            r#"{"pattern_key": "hip_fx", "inclusion": ["hip\\s+fracture"]}"#,
        )
        .unwrap();
        assert_eq!(rule, PatternRule::new("hip_fx", ["hip\\s+fracture"]));
        assert!(rule.applies_to(SourceType::Lab));
        assert!(!rule.is_treatment());
    }

    #[test]
    fn test_source_restriction() {
        let rule = PatternRule::treatment("ortho_surgery", ["ORIF"])
            .with_sources([SourceType::OperativeNote, SourceType::Procedure]);
        assert!(rule.applies_to(SourceType::OperativeNote));
        assert!(!rule.applies_to(SourceType::NursingNote));
        assert!(rule.is_treatment());
    }
}
