//! Trauma gate error codes following a structured numbering system
//!
//! Error code ranges:
//! - TG0001-TG0099: Rule definition errors (fatal at compile time)
//! - TG0100-TG0199: Evidence conditions (degrade a single gate to indeterminate)
//! - TG0400-TG0499: System errors (configuration, collaborators)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TG{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

use std::collections::HashMap;
use std::sync::LazyLock;

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Rule definition errors (0001-0099)
    map.insert(1, ErrorInfo::new("Invalid pattern regex")
        .with_help("Patterns use Rust regex syntax and are compiled case-insensitively"));
    map.insert(2, ErrorInfo::new("Duplicate pattern key"));
    map.insert(3, ErrorInfo::new("Pattern has no inclusion regex"));
    map.insert(4, ErrorInfo::new("Dangling context key reference"));
    map.insert(5, ErrorInfo::new("Duplicate definition id"));
    map.insert(6, ErrorInfo::new("Duplicate gate id"));
    map.insert(7, ErrorInfo::new("Dangling pattern reference")
        .with_help("Every gate pattern key must name a pattern in the same rule set"));
    map.insert(8, ErrorInfo::new("Gate references no patterns"));
    map.insert(9, ErrorInfo::new("Treatment gate references a non-treatment pattern"));
    map.insert(10, ErrorInfo::new("Invalid timing constraint"));
    map.insert(11, ErrorInfo::new("Invalid classifier marker"));
    map.insert(12, ErrorInfo::new("Definition has no trigger gate"));
    map.insert(13, ErrorInfo::new("Pass outcome not valid for the definition kind")
        .with_help("Protocols return COMPLIANT, NON_COMPLIANT, INDETERMINATE or NOT_TRIGGERED; events return YES, NO or UNABLE_TO_DETERMINE"));
    map.insert(14, ErrorInfo::new("Invalid numeric threshold")
        .with_help("Threshold patterns need a capture group around the value they compare"));
    map.insert(15, ErrorInfo::new("Gate source scope is empty"));

    // Evidence conditions (0100-0199)
    map.insert(100, ErrorInfo::new("Required source type absent from corpus"));
    map.insert(101, ErrorInfo::new("Reference time unavailable"));
    map.insert(102, ErrorInfo::new("Evidence timestamp missing"));
    map.insert(103, ErrorInfo::new("Evidence timestamp malformed"));
    map.insert(104, ErrorInfo::new("Numeric value not documented"));
    map.insert(105, ErrorInfo::new("Time window out of range"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("Configuration error"));
    map.insert(402, ErrorInfo::new("Collaborator error"));

    map
});

// Rule definition errors
pub const TG0001: ErrorCode = ErrorCode::new(1);
pub const TG0002: ErrorCode = ErrorCode::new(2);
pub const TG0003: ErrorCode = ErrorCode::new(3);
pub const TG0004: ErrorCode = ErrorCode::new(4);
pub const TG0005: ErrorCode = ErrorCode::new(5);
pub const TG0006: ErrorCode = ErrorCode::new(6);
pub const TG0007: ErrorCode = ErrorCode::new(7);
pub const TG0008: ErrorCode = ErrorCode::new(8);
pub const TG0009: ErrorCode = ErrorCode::new(9);
pub const TG0010: ErrorCode = ErrorCode::new(10);
pub const TG0011: ErrorCode = ErrorCode::new(11);
pub const TG0012: ErrorCode = ErrorCode::new(12);
pub const TG0013: ErrorCode = ErrorCode::new(13);
pub const TG0014: ErrorCode = ErrorCode::new(14);
pub const TG0015: ErrorCode = ErrorCode::new(15);

// Evidence conditions
pub const TG0100: ErrorCode = ErrorCode::new(100);
pub const TG0101: ErrorCode = ErrorCode::new(101);
pub const TG0102: ErrorCode = ErrorCode::new(102);
pub const TG0103: ErrorCode = ErrorCode::new(103);
pub const TG0104: ErrorCode = ErrorCode::new(104);
pub const TG0105: ErrorCode = ErrorCode::new(105);

// System errors
pub const TG0400: ErrorCode = ErrorCode::new(400);
pub const TG0401: ErrorCode = ErrorCode::new(401);
pub const TG0402: ErrorCode = ErrorCode::new(402);
