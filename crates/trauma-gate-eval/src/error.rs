//! Evaluation errors for the gating engine
//!
//! Per-patient data problems never surface here; they degrade a single gate
//! to INDETERMINATE. Errors are reserved for broken rules, bad configuration
//! and requests the rule set cannot answer.

use thiserror::Error;
use trauma_gate_diagnostics::{Diagnostic, ErrorCode, RuleDefinitionError, TG0400, TG0401};

/// Result type for engine operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while compiling or evaluating rules
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Rule content failed validation
    #[error(transparent)]
    RuleDefinition(#[from] RuleDefinitionError),

    /// The requested definition is not part of the compiled rule set
    #[error("Unknown definition '{definition_id}' in rule set {rule_set_version}")]
    UnknownDefinition {
        definition_id: String,
        rule_set_version: String,
    },

    /// Engine configuration could not be loaded
    #[error("Invalid engine configuration: {message}")]
    InvalidConfig { message: String },
}

impl EvalError {
    /// Create an unknown definition error
    pub fn unknown_definition(
        definition_id: impl Into<String>,
        rule_set_version: impl Into<String>,
    ) -> Self {
        Self::UnknownDefinition {
            definition_id: definition_id.into(),
            rule_set_version: rule_set_version.into(),
        }
    }

    /// Create a configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RuleDefinition(err) => err.code(),
            Self::UnknownDefinition { .. } => TG0400,
            Self::InvalidConfig { .. } => TG0401,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::RuleDefinition(err) => err.to_diagnostic(),
            other => Diagnostic::error(other.code(), other.to_string()),
        }
    }
}
