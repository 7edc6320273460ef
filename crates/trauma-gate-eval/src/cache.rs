//! Compiled rule-set cache
//!
//! Compiling a rule set validates and builds every regex, so the engine
//! keeps one compiled copy per rule-set version and hands out `Arc`s. The
//! lock is held only for lookup and insertion; evaluation never touches it.

use crate::compiler::CompiledRuleSet;
use crate::config::EngineConfig;
use crate::error::EvalResult;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use trauma_gate_rules::RuleSetDocument;

/// Cache hit and miss counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Compiled rule sets keyed by version.
///
/// A version string is assumed to identify its content: documents sharing a
/// version are never recompiled.
#[derive(Debug, Default)]
pub struct RuleSetCache {
    entries: RwLock<IndexMap<String, Arc<CompiledRuleSet>>>,
    stats: RwLock<CacheStats>,
}

impl RuleSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: &str) -> Option<Arc<CompiledRuleSet>> {
        let found = self.entries.read().get(version).cloned();
        let mut stats = self.stats.write();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    /// Return the cached compilation of `document`, compiling it on a miss.
    ///
    /// Compilation runs outside the lock. When two callers race on the same
    /// version the first insert wins and both get the same `Arc`.
    pub fn get_or_compile(
        &self,
        document: &RuleSetDocument,
        config: &EngineConfig,
    ) -> EvalResult<Arc<CompiledRuleSet>> {
        if let Some(compiled) = self.get(&document.version) {
            return Ok(compiled);
        }
        let compiled = Arc::new(CompiledRuleSet::compile(document, config)?);
        let mut entries = self.entries.write();
        let entry = entries
            .entry(document.version.clone())
            .or_insert(compiled);
        Ok(Arc::clone(entry))
    }

    /// Insert a compiled rule set, replacing any entry for its version
    pub fn insert(&self, compiled: Arc<CompiledRuleSet>) -> Option<Arc<CompiledRuleSet>> {
        self.entries
            .write()
            .insert(compiled.version().to_string(), compiled)
    }

    pub fn invalidate(&self, version: &str) -> Option<Arc<CompiledRuleSet>> {
        self.entries.write().shift_remove(version)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        *self.stats.write() = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Cached versions in insertion order
    pub fn versions(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }
}
