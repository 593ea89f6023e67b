//! Parsing of untrusted timestamp header values.
//!
//! Parsing never panics and never errors past this module: anything that is not a
//! recognised encoding yields `None`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MILLIS_DIGIT_THRESHOLD;

/// Which timestamp encodings a verifier accepts.
///
/// Signer and verifier must agree on the policy; a mismatch rejects every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampPolicy {
    /// Unix seconds, Unix milliseconds (13 or more digits) or ISO-8601.
    /// ISO-8601 values without an offset are taken as UTC.
    #[default]
    Flexible,
    /// Unix seconds only. ISO-8601 and millisecond values are rejected.
    UnixSecondsStrict,
}

/// Offset-carrying forms not covered by RFC 3339 (e.g. `+0000`).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Offset-less forms, assumed UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse a raw timestamp header value into a UTC instant.
pub fn parse_timestamp(raw: &str, policy: TimestampPolicy) -> Option<DateTime<Utc>> {
    match policy {
        TimestampPolicy::UnixSecondsStrict => {
            if raw.is_empty()
                || raw.len() >= MILLIS_DIGIT_THRESHOLD
                || !raw.bytes().all(|b| b.is_ascii_digit())
            {
                return None;
            }
            DateTime::from_timestamp(raw.parse().ok()?, 0)
        }
        TimestampPolicy::Flexible => {
            if is_integer(raw) {
                parse_unix(raw)
            } else {
                parse_iso8601(raw)
            }
        }
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_unix(raw: &str) -> Option<DateTime<Utc>> {
    let digit_count = raw.trim_start_matches('-').len();
    let value: i64 = raw.parse().ok()?;
    if digit_count >= MILLIS_DIGIT_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
