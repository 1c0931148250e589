//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the timesheet core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input could not be parsed as a date or date-time.
    #[error("invalid timestamp: {input:?}")]
    InvalidTimestamp { input: String },

    /// A period ends before it starts.
    #[error("invalid period: {from} is after {to}")]
    InvalidPeriod {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Shifting a timestamp left the representable date range.
    #[error("{base} shifted by {offset} is out of range")]
    OutOfRange { base: DateTime<Utc>, offset: String },

    /// A configured hours value is unusable.
    #[error("invalid hours.{field}: {reason}")]
    InvalidHours {
        field: &'static str,
        reason: &'static str,
    },
}

/// Result alias for core operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A validated activity identifier (the tracker's issue key, e.g. `PRJ-123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActivityId(String);

impl ActivityId {
    /// Creates a new ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::Empty {
                field: "activity ID",
            });
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActivityId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActivityId> for String {
    fn from(id: ActivityId) -> Self {
        id.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ActivityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_id_rejects_empty() {
        assert!(ActivityId::new("").is_err());
        assert!(ActivityId::new("   ").is_err());
        assert!(ActivityId::new("PRJ-1").is_ok());
    }

    #[test]
    fn activity_id_serde_roundtrip() {
        let id = ActivityId::new("PRJ-123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"PRJ-123\"");
        let parsed: ActivityId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn activity_id_serde_rejects_empty() {
        let result: Result<ActivityId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn activity_id_as_ref() {
        let id = ActivityId::new("PRJ-7").unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, "PRJ-7");
        assert_eq!(id.to_string(), "PRJ-7");
    }

    #[test]
    fn invalid_period_message_names_both_ends() {
        use chrono::TimeZone;
        let from = Utc.with_ymd_and_hms(2020, 3, 2, 12, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2020, 3, 2, 9, 0, 0).unwrap();
        let msg = Error::InvalidPeriod { from, to }.to_string();
        assert!(msg.contains("2020-03-02 12:00:00 UTC"), "{msg}");
        assert!(msg.contains("2020-03-02 09:00:00 UTC"), "{msg}");
    }

    #[test]
    fn invalid_hours_message_names_key() {
        let msg = Error::InvalidHours {
            field: "lunch",
            reason: "must not be negative",
        }
        .to_string();
        assert_eq!(msg, "invalid hours.lunch: must not be negative");
    }
}
