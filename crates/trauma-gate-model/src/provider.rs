//! Collaborator traits for evidence, rules and results

use trauma_gate_diagnostics::{Diagnostic, ErrorCode, TG0402};
use trauma_gate_rules::RuleSetDocument;
use trauma_gate_types::{EvidenceCorpus, ProtocolResult};

/// Supplies the ingested evidence for a patient
pub trait EvidenceSource: Send + Sync {
    fn corpus(&self, patient_id: &str) -> Result<EvidenceCorpus, ProviderError>;

    /// Patients this source can supply, in a stable order
    fn patient_ids(&self) -> Vec<String>;
}

/// Supplies rule-set documents by version
pub trait RuleSetSource: Send + Sync {
    fn rule_set(&self, version: &str) -> Result<RuleSetDocument, ProviderError>;

    /// The version to use when the caller does not name one
    fn current_version(&self) -> Option<String>;
}

/// Receives complete results; partial results are never published
pub trait ResultSink: Send + Sync {
    fn publish(&self, result: &ProtocolResult) -> Result<(), ProviderError>;
}

/// Collaborator failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Rule set not found: {0}")]
    RuleSetNotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Result rejected: {0}")]
    Rejected(String),
}

impl ProviderError {
    pub fn code(&self) -> ErrorCode {
        TG0402
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}
