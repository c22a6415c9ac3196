use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Error,
    Success,
}

impl LogLevel {
    /// Matches the upper-case keyword used in raw container log lines.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "INFO" => Some(LogLevel::Info),
            "ERROR" => Some(LogLevel::Error),
            "SUCCESS" => Some(LogLevel::Success),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "info",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// ISO 8601 timestamp exactly as emitted by the container.
    pub timestamp: String,
    pub message: String,
    pub level: LogLevel,
}

impl LogLine {
    pub fn cmp_timestamp(&self, other: &LogLine) -> Ordering {
        compare_timestamps(&self.timestamp, &other.timestamp)
    }
}

/// Orders two log timestamps. RFC 3339 values compare as instants; anything
/// else falls back to a plain string comparison.
pub fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (
        OffsetDateTime::parse(a, &Rfc3339),
        OffsetDateTime::parse(b, &Rfc3339),
    ) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
