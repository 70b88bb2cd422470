//! Timestamp helpers for version snapshot names and value introspection.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Format used in version file names: `YYYY-MM-DD-HHMMSS`.
pub const VERSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Errors that can occur during timestamp parsing.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The timestamp string is empty.
    #[error("Empty timestamp string")]
    EmptyString,

    /// The timestamp value is invalid.
    #[error("Invalid timestamp: {0}")]
    InvalidFormat(String),
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp for use in a version file name.
///
/// The result sorts lexicographically in chronological order.
///
/// # Examples
///
/// ```
/// use apicontract::utils::timestamps::version_timestamp;
/// use chrono::{TimeZone, Utc};
///
/// let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
/// assert_eq!(version_timestamp(&ts), "2024-03-09-070501");
/// ```
#[must_use]
pub fn version_timestamp(dt: &Timestamp) -> String {
    dt.format(VERSION_TIMESTAMP_FORMAT).to_string()
}

/// Parses the timestamp part of a version id back into a UTC time.
///
/// A `_N` collision suffix is ignored.
pub fn parse_version_timestamp(input: &str) -> Result<Timestamp, TimestampError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::EmptyString);
    }
    let base = trimmed.split('_').next().unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(base, VERSION_TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| TimestampError::InvalidFormat(trimmed.to_string()))
}

/// Returns true when a string value looks like an RFC 3339 date-time.
#[must_use]
pub fn looks_like_datetime(value: &str) -> bool {
    let normalized = value.replace('Z', "+00:00");
    if DateTime::parse_from_rfc3339(&normalized).is_ok() {
        return true;
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

/// Formats a timestamp as ISO 8601 string.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}
