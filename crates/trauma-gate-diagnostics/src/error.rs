//! Rule definition errors and diagnostics

use crate::{
    ErrorCode, TG0001, TG0002, TG0003, TG0004, TG0005, TG0006, TG0007, TG0008, TG0009, TG0010,
    TG0011, TG0012, TG0013, TG0014, TG0015,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - compilation cannot proceed
    Error,
    /// Warning - evaluation continues with a degraded result
    Warning,
    /// Information - informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message suitable for surfacing to an operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            help: None,
        }
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(help) = &self.help {
            write!(f, " ({})", help)?;
        }
        Ok(())
    }
}

/// Malformed or inconsistent rule content, detected while compiling a rule set.
///
/// These errors are fatal for the affected rule set: a definition that fails
/// to compile is never evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleDefinitionError {
    #[error("pattern '{pattern_key}': invalid regex '{pattern}': {message}")]
    InvalidRegex {
        pattern_key: String,
        pattern: String,
        message: String,
    },

    #[error("pattern '{pattern_key}' is defined more than once")]
    DuplicatePatternKey { pattern_key: String },

    #[error("pattern '{pattern_key}' has no inclusion patterns")]
    EmptyPattern { pattern_key: String },

    #[error("pattern '{pattern_key}' requires unknown context key '{context_key}'")]
    DanglingContextKey {
        pattern_key: String,
        context_key: String,
    },

    #[error("definition '{definition_id}' is defined more than once")]
    DuplicateDefinition { definition_id: String },

    #[error("definition '{definition_id}': gate '{gate_id}' is defined more than once")]
    DuplicateGateId {
        definition_id: String,
        gate_id: String,
    },

    #[error("definition '{definition_id}': gate '{gate_id}' references unknown pattern '{pattern_key}'")]
    DanglingPatternReference {
        definition_id: String,
        gate_id: String,
        pattern_key: String,
    },

    #[error("definition '{definition_id}': gate '{gate_id}' references no patterns")]
    EmptyGate {
        definition_id: String,
        gate_id: String,
    },

    #[error("definition '{definition_id}': treatment gate '{gate_id}' references non-treatment pattern '{pattern_key}'")]
    NotATreatmentPattern {
        definition_id: String,
        gate_id: String,
        pattern_key: String,
    },

    #[error("definition '{definition_id}': gate '{gate_id}': {message}")]
    InvalidTimingConstraint {
        definition_id: String,
        gate_id: String,
        message: String,
    },

    #[error("classifier table '{table}': invalid marker '{marker}': {message}")]
    InvalidClassifierMarker {
        table: String,
        marker: String,
        message: String,
    },

    #[error("definition '{definition_id}' has no trigger gate")]
    MissingTrigger { definition_id: String },

    #[error("definition '{definition_id}': gate '{gate_id}': pass outcome {outcome} is not a valid {kind} outcome")]
    InvalidPassOutcome {
        definition_id: String,
        gate_id: String,
        outcome: String,
        kind: String,
    },

    #[error("definition '{definition_id}': gate '{gate_id}': {message}")]
    InvalidThreshold {
        definition_id: String,
        gate_id: String,
        message: String,
    },

    #[error("definition '{definition_id}': gate '{gate_id}' restricts itself to no source types")]
    EmptySourceScope {
        definition_id: String,
        gate_id: String,
    },
}

impl RuleDefinitionError {
    /// Create an invalid regex error
    pub fn invalid_regex(
        pattern_key: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRegex {
            pattern_key: pattern_key.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a dangling pattern reference error
    pub fn dangling_pattern(
        definition_id: impl Into<String>,
        gate_id: impl Into<String>,
        pattern_key: impl Into<String>,
    ) -> Self {
        Self::DanglingPatternReference {
            definition_id: definition_id.into(),
            gate_id: gate_id.into(),
            pattern_key: pattern_key.into(),
        }
    }

    /// Create an invalid timing constraint error
    pub fn invalid_timing(
        definition_id: impl Into<String>,
        gate_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidTimingConstraint {
            definition_id: definition_id.into(),
            gate_id: gate_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid threshold error
    pub fn invalid_threshold(
        definition_id: impl Into<String>,
        gate_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidThreshold {
            definition_id: definition_id.into(),
            gate_id: gate_id.into(),
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRegex { .. } => TG0001,
            Self::DuplicatePatternKey { .. } => TG0002,
            Self::EmptyPattern { .. } => TG0003,
            Self::DanglingContextKey { .. } => TG0004,
            Self::DuplicateDefinition { .. } => TG0005,
            Self::DuplicateGateId { .. } => TG0006,
            Self::DanglingPatternReference { .. } => TG0007,
            Self::EmptyGate { .. } => TG0008,
            Self::NotATreatmentPattern { .. } => TG0009,
            Self::InvalidTimingConstraint { .. } => TG0010,
            Self::InvalidClassifierMarker { .. } => TG0011,
            Self::MissingTrigger { .. } => TG0012,
            Self::InvalidPassOutcome { .. } => TG0013,
            Self::InvalidThreshold { .. } => TG0014,
            Self::EmptySourceScope { .. } => TG0015,
        }
    }

    /// The pattern key at fault, when the error concerns a single pattern
    pub fn pattern_key(&self) -> Option<&str> {
        match self {
            Self::InvalidRegex { pattern_key, .. }
            | Self::DuplicatePatternKey { pattern_key }
            | Self::EmptyPattern { pattern_key }
            | Self::DanglingContextKey { pattern_key, .. }
            | Self::DanglingPatternReference { pattern_key, .. }
            | Self::NotATreatmentPattern { pattern_key, .. } => Some(pattern_key.as_str()),
            _ => None,
        }
    }

    /// The definition at fault, when the error concerns a definition
    pub fn definition_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateDefinition { definition_id }
            | Self::DuplicateGateId { definition_id, .. }
            | Self::DanglingPatternReference { definition_id, .. }
            | Self::EmptyGate { definition_id, .. }
            | Self::NotATreatmentPattern { definition_id, .. }
            | Self::InvalidTimingConstraint { definition_id, .. }
            | Self::MissingTrigger { definition_id }
            | Self::InvalidPassOutcome { definition_id, .. }
            | Self::InvalidThreshold { definition_id, .. }
            | Self::EmptySourceScope { definition_id, .. } => Some(definition_id.as_str()),
            _ => None,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = self.code();
        let diag = Diagnostic::error(code, self.to_string());
        match code.info().help {
            Some(help) => diag.with_help(help),
            None => diag,
        }
    }
}
