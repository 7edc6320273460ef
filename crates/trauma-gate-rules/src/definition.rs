//! Protocol and event definitions, and the versioned rule-set document

use crate::{Gate, PatternRule};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trauma_gate_types::DefinitionKind;

/// Whether a definition is evaluated or only carried for reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    #[default]
    Full,
    /// Reference material only; results are reported as not evaluated
    ContextOnly,
}

/// A protocol or NTDS event: ordered gates under a version identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub id: String,
    pub name: String,
    pub version: String,
    pub kind: DefinitionKind,
    #[serde(default)]
    pub evaluation_mode: EvaluationMode,
    pub gates: Vec<Gate>,
}

impl Definition {
    pub fn protocol(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            kind: DefinitionKind::Protocol,
            evaluation_mode: EvaluationMode::Full,
            gates: Vec::new(),
        }
    }

    pub fn event(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: DefinitionKind::Event,
            ..Self::protocol(id, name, version)
        }
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn context_only(mut self) -> Self {
        self.evaluation_mode = EvaluationMode::ContextOnly;
        self
    }

    pub fn gate(&self, gate_id: &str) -> Option<&Gate> {
        self.gates.iter().find(|g| g.gate_id == gate_id)
    }
}

/// A versioned set of patterns and the definitions that reference them.
///
/// This is the unit the engine compiles and caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetDocument {
    pub version: String,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

impl RuleSetDocument {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            patterns: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: PatternRule) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Patterns keyed by pattern key, in document order.
    ///
    /// Later duplicates are dropped here; the compiler reports them.
    pub fn pattern_index(&self) -> IndexMap<&str, &PatternRule> {
        let mut index = IndexMap::with_capacity(self.patterns.len());
        for pattern in &self.patterns {
            index.entry(pattern.pattern_key.as_str()).or_insert(pattern);
        }
        index
    }

    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.id == id)
    }
}
