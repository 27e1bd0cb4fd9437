//! Shared helpers for timestamps and tolerant deserialization.
//!
//! The analysis service emits ISO 8601 timestamps in two shapes depending on
//! the upstream provider:
//!
//! - RFC 3339 with offset (`2026-01-10T14:00:00Z`, `...+00:00`)
//! - naive local-less strings (`2026-01-10T14:00`), which are read as UTC

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parse a service timestamp into UTC. Returns `None` if no known format matches.
pub fn parse_service_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    None
}

/// Deserialize an optional string field through `FromStr`, mapping values
/// that don't parse to `None` instead of failing the enclosing document.
pub(crate) fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match s.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unrecognised value '{}' from service", s);
            None
        }
    }))
}

/// Human-friendly age, e.g. "12m 5s".
pub fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds().max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}
