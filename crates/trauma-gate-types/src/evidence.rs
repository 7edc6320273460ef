//! Evidence blocks and the per-patient evidence corpus

use crate::{BlockTimestamp, SourceType};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a block inside its corpus.
///
/// Valid only for the corpus that produced it; corpora are never reordered
/// after construction so a reference stays stable for the whole evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockRef(pub usize);

impl BlockRef {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One timestamped, source-tagged unit of clinical text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBlock {
    pub source_type: SourceType,
    #[serde(default = "missing_timestamp")]
    pub timestamp: BlockTimestamp,
    pub raw_text: String,
    /// Opaque provenance carried through from the source export
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pointer: IndexMap<String, String>,
}

fn missing_timestamp() -> BlockTimestamp {
    BlockTimestamp::Missing
}

impl EvidenceBlock {
    pub fn new(
        source_type: SourceType,
        timestamp: impl Into<BlockTimestamp>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            timestamp: timestamp.into(),
            raw_text: raw_text.into(),
            pointer: IndexMap::new(),
        }
    }

    /// A block whose source carried no timestamp
    pub fn undated(source_type: SourceType, raw_text: impl Into<String>) -> Self {
        Self::new(source_type, BlockTimestamp::Missing, raw_text)
    }

    /// Attach a provenance entry
    pub fn with_pointer(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pointer.insert(key.into(), value.into());
        self
    }

    /// The parsed timestamp, if the block has one
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        self.timestamp.datetime()
    }
}

/// Ordered evidence for one patient.
///
/// Blocks are sorted by timestamp on construction. The sort is stable and
/// blocks without a usable timestamp follow all dated blocks in their
/// original relative order. The block list is not exposed mutably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCorpus")]
pub struct EvidenceCorpus {
    patient_id: String,
    reference_time: Option<NaiveDateTime>,
    blocks: Vec<EvidenceBlock>,
}

#[derive(Deserialize)]
struct RawCorpus {
    patient_id: String,
    #[serde(default)]
    reference_time: Option<BlockTimestamp>,
    #[serde(default)]
    blocks: Vec<EvidenceBlock>,
}

impl From<RawCorpus> for EvidenceCorpus {
    fn from(raw: RawCorpus) -> Self {
        let reference = raw.reference_time.and_then(|ts| ts.datetime());
        Self::new(raw.patient_id, reference, raw.blocks)
    }
}

impl EvidenceCorpus {
    /// Build a corpus, ordering blocks chronologically
    pub fn new(
        patient_id: impl Into<String>,
        reference_time: Option<NaiveDateTime>,
        mut blocks: Vec<EvidenceBlock>,
    ) -> Self {
        // `None` sorts first for Option, so key on (is_undated, time)
        blocks.sort_by_key(|block| match block.datetime() {
            Some(dt) => (false, Some(dt)),
            None => (true, None),
        });
        Self {
            patient_id: patient_id.into(),
            reference_time,
            blocks,
        }
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Arrival time, or whatever reference event ingestion supplied
    pub fn reference_time(&self) -> Option<NaiveDateTime> {
        self.reference_time
    }

    pub fn blocks(&self) -> &[EvidenceBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, block: BlockRef) -> Option<&EvidenceBlock> {
        self.blocks.get(block.0)
    }

    /// Blocks paired with their references, in corpus order
    pub fn iter(&self) -> impl Iterator<Item = (BlockRef, &EvidenceBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (BlockRef(i), block))
    }

    /// Latest parsed timestamp in the corpus
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.blocks.iter().filter_map(EvidenceBlock::datetime).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_timestamp;
    use pretty_assertions::assert_eq;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_corpus_orders_blocks() {
        let corpus = EvidenceCorpus::new(
            "P1",
            None,
            vec![
                EvidenceBlock::undated(SourceType::NursingNote, "first undated"),
                EvidenceBlock::new(SourceType::EdNote, ts("2025-03-02 08:00"), "later"),
                EvidenceBlock::new(
                    SourceType::Lab,
                    BlockTimestamp::Malformed("??".into()),
                    "second undated",
                ),
                EvidenceBlock::new(SourceType::TraumaHp, ts("2025-03-01 08:00"), "earlier"),
            ],
        );
        let texts: Vec<&str> = corpus.blocks().iter().map(|b| b.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["earlier", "later", "first undated", "second undated"]);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let t = ts("2025-03-01 08:00");
        let corpus = EvidenceCorpus::new(
            "P1",
            None,
            vec![
                EvidenceBlock::new(SourceType::EdNote, t, "a"),
                EvidenceBlock::new(SourceType::EdNote, t, "b"),
            ],
        );
        assert_eq!(corpus.get(BlockRef(0)).unwrap().raw_text, "a");
        assert_eq!(corpus.get(BlockRef(1)).unwrap().raw_text, "b");
    }

    #[test]
    fn test_corpus_from_json() {
        let json = r#"{
            "patient_id": "P9",
            "reference_time": "2025-03-01T10:00:00",
            "blocks": [
                {"source_type": "IMAGING", "timestamp": "03/01/25 1200", "raw_text": "CT head"},
                {"source_type": "ED_NOTE", "raw_text": "no time", "pointer": {"file": "ed.txt"}}
            ]
        }"#;
        let corpus: EvidenceCorpus = serde_json::from_str(json).unwrap();
        assert_eq!(corpus.patient_id(), "P9");
        assert_eq!(corpus.reference_time(), Some(ts("2025-03-01 10:00")));
        assert_eq!(corpus.blocks()[0].source_type, SourceType::Imaging);
        assert_eq!(corpus.blocks()[1].pointer.get("file").map(String::as_str), Some("ed.txt"));
        assert_eq!(corpus.last_timestamp(), Some(ts("2025-03-01 12:00")));
    }
}
