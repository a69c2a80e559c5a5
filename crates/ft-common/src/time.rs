//! Millisecond timestamps.
//!
//! Flow files carry timestamps either as milliseconds since the Unix epoch
//! (integer or decimal, e.g. `1678312157497.123`) or as RFC 3339 strings.
//! Everything inside the analyzer works on [`TimestampMs`].

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Milliseconds since the Unix epoch (or since an external reference
/// instant, for relative flow files).
pub type TimestampMs = i64;

/// Timestamp parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("empty timestamp")]
    Empty,

    #[error("malformed timestamp '{0}'")]
    Malformed(String),

    #[error("timestamp '{0}' out of range")]
    OutOfRange(String),
}

/// Parse a timestamp in any accepted textual form.
///
/// Decimal milliseconds are truncated to millisecond resolution.
pub fn parse_timestamp(raw: &str) -> Result<TimestampMs, TimestampError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }

    if let Some((int_part, frac_part)) = s.split_once('.') {
        let digits = int_part.strip_prefix('-').unwrap_or(int_part);
        let numeric = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !frac_part.is_empty()
            && frac_part.bytes().all(|b| b.is_ascii_digit());
        if numeric {
            return int_part
                .parse::<i64>()
                .map_err(|_| TimestampError::OutOfRange(s.to_string()));
        }
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
        .map_err(|_| TimestampError::Malformed(s.to_string()))
}

/// Convert a UTC datetime to milliseconds.
pub fn from_datetime(dt: DateTime<Utc>) -> TimestampMs {
    dt.timestamp_millis()
}

/// Render a timestamp as RFC 3339 with millisecond precision.
///
/// Values outside chrono's range fall back to the raw millisecond count.
pub fn format_timestamp(ms: TimestampMs) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}
