//! In-memory collaborators and a JSON-backed rule source

use crate::provider::{EvidenceSource, ProviderError, ResultSink, RuleSetSource};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use trauma_gate_rules::RuleSetDocument;
use trauma_gate_types::{EvidenceCorpus, ProtocolResult};

/// Evidence held in memory, keyed by patient id in insertion order
#[derive(Debug, Clone, Default)]
pub struct InMemoryEvidenceSource {
    corpora: IndexMap<String, EvidenceCorpus>,
}

impl InMemoryEvidenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a corpus, replacing any earlier one for the same patient
    pub fn insert(&mut self, corpus: EvidenceCorpus) {
        self.corpora.insert(corpus.patient_id().to_string(), corpus);
    }

    pub fn with_corpus(mut self, corpus: EvidenceCorpus) -> Self {
        self.insert(corpus);
        self
    }

    /// Load a JSON array of corpora
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let corpora: Vec<EvidenceCorpus> =
            serde_json::from_str(json).map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(corpora.into_iter().fold(Self::new(), Self::with_corpus))
    }
}

impl EvidenceSource for InMemoryEvidenceSource {
    fn corpus(&self, patient_id: &str) -> Result<EvidenceCorpus, ProviderError> {
        self.corpora
            .get(patient_id)
            .cloned()
            .ok_or_else(|| ProviderError::PatientNotFound(patient_id.to_string()))
    }

    fn patient_ids(&self) -> Vec<String> {
        self.corpora.keys().cloned().collect()
    }
}

/// Rule sets held in memory; the last one added is current
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleSetSource {
    documents: IndexMap<String, RuleSetDocument>,
}

impl InMemoryRuleSetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, document: RuleSetDocument) -> Self {
        self.documents.shift_remove(&document.version);
        self.documents.insert(document.version.clone(), document);
        self
    }

    /// Load a single rule-set document from JSON
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let document =
            RuleSetDocument::from_json(json).map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(Self::new().with_document(document))
    }

    /// Load a single rule-set document from a JSON file
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self, ProviderError> {
        let json =
            std::fs::read_to_string(path).map_err(|e| ProviderError::IoError(e.to_string()))?;
        Self::from_json(&json)
    }
}

impl RuleSetSource for InMemoryRuleSetSource {
    fn rule_set(&self, version: &str) -> Result<RuleSetDocument, ProviderError> {
        self.documents
            .get(version)
            .cloned()
            .ok_or_else(|| ProviderError::RuleSetNotFound(version.to_string()))
    }

    fn current_version(&self) -> Option<String> {
        self.documents.keys().last().cloned()
    }
}

/// Collects published results; clones share the same storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryResultSink {
    results: Arc<RwLock<Vec<ProtocolResult>>>,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in publication order
    pub fn results(&self) -> Vec<ProtocolResult> {
        self.results.read().clone()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

impl ResultSink for InMemoryResultSink {
    fn publish(&self, result: &ProtocolResult) -> Result<(), ProviderError> {
        self.results.write().push(result.clone());
        Ok(())
    }
}
