//! Evidence timestamps
//!
//! Clinical exports carry local wall-clock times in a handful of formats.
//! Parsing happens once, at ingestion, and the outcome is kept as a
//! tri-state so that a malformed timestamp degrades only the gates that
//! depend on it.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Accepted timestamp layouts, tried in order
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H%M",
    "%m/%d/%Y %H%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M",
];

/// Parse a clinical timestamp string.
///
/// A trailing `Z` is accepted and ignored; all timestamps are compared as
/// wall-clock times of the treating facility.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Timestamp of an evidence block as received from ingestion.
///
/// Serializes as the raw string form (or `null` when missing), so a
/// malformed value round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockTimestamp {
    /// A parsed wall-clock time
    At(NaiveDateTime),
    /// The source carried no timestamp
    Missing,
    /// The source carried a timestamp that could not be parsed
    Malformed(String),
}

impl BlockTimestamp {
    /// Classify an optional raw timestamp
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Missing,
            Some(s) => match parse_timestamp(s) {
                Some(dt) => Self::At(dt),
                None => Self::Malformed(s.to_string()),
            },
        }
    }

    /// The parsed time, if any
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::At(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<NaiveDateTime> for BlockTimestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self::At(dt)
    }
}

impl Serialize for BlockTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::At(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Self::Missing => serializer.serialize_none(),
            Self::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for BlockTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::parse(raw.as_deref()))
    }
}

impl fmt::Display for BlockTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Self::Missing => write!(f, "(no timestamp)"),
            Self::Malformed(raw) => write!(f, "(unparseable timestamp '{}')", raw),
        }
    }
}
