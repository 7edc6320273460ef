//! Rule-set serialization
//!
//! Rule sets are exchanged as JSON. Loading only checks shape; semantic
//! validation is the compiler's job.

use std::io::{Read, Write};

use crate::definition::RuleSetDocument;

/// Errors that can occur while reading or writing a rule set
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for rule-set serializers
pub trait RuleSetSerializer {
    fn serialize(&self, document: &RuleSetDocument) -> Result<String, SerializeError>;

    fn serialize_to_writer<W: Write>(
        &self,
        document: &RuleSetDocument,
        writer: W,
    ) -> Result<(), SerializeError>;

    fn deserialize(&self, input: &str) -> Result<RuleSetDocument, SerializeError>;

    fn deserialize_from_reader<R: Read>(&self, reader: R)
    -> Result<RuleSetDocument, SerializeError>;
}

/// JSON serializer for rule sets
#[derive(Debug, Default, Clone)]
pub struct JsonSerializer {
    /// Whether to produce pretty-printed output
    pub pretty: bool,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl RuleSetSerializer for JsonSerializer {
    fn serialize(&self, document: &RuleSetDocument) -> Result<String, SerializeError> {
        let out = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        Ok(out)
    }

    fn serialize_to_writer<W: Write>(
        &self,
        document: &RuleSetDocument,
        mut writer: W,
    ) -> Result<(), SerializeError> {
        let json = self.serialize(document)?;
        writer.write_all(json.as_bytes())?;
        Ok(())
    }

    fn deserialize(&self, input: &str) -> Result<RuleSetDocument, SerializeError> {
        Ok(serde_json::from_str(input)?)
    }

    fn deserialize_from_reader<R: Read>(
        &self,
        reader: R,
    ) -> Result<RuleSetDocument, SerializeError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl RuleSetDocument {
    pub fn to_json(&self) -> Result<String, SerializeError> {
        JsonSerializer::new().serialize(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, SerializeError> {
        JsonSerializer::pretty().serialize(self)
    }

    pub fn from_json(json: &str) -> Result<Self, SerializeError> {
        JsonSerializer::new().deserialize(json)
    }
}
