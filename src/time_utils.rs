// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.
//!
//! Log timestamps are stored as fixed-width RFC3339 strings with millisecond
//! precision so that Firestore's lexicographic ordering matches time order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Offset-less formats accepted from clients; interpreted as UTC.
const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a client-supplied timestamp.
///
/// Accepts RFC3339 (with `Z` or a numeric offset), ISO 8601 without an
/// offset, `YYYY-MM-DD HH:MM:SS[.fff]`, and a bare `YYYY-MM-DD` date
/// (midnight). Values without an offset are taken as UTC.
pub fn parse_log_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a UTC timestamp in the storage format (`2024-01-15T10:30:45.123Z`).
pub fn format_storage(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a stored timestamp as `HH:MM:SS` for the live console.
///
/// Unparsable values fall back to the time portion of the string, or the
/// string itself.
pub fn format_clock(raw: &str) -> String {
    if let Some(dt) = parse_log_timestamp(raw) {
        return dt.format("%H:%M:%S").to_string();
    }

    if let Some((_, time)) = raw.split_once('T') {
        return time.split('.').next().unwrap_or(time).to_string();
    }
    if let Some((_, time)) = raw.split_once(' ') {
        return time.to_string();
    }
    raw.to_string()
}

/// Format a stored timestamp as `YYYY-MM-DD HH:MM:SS` for the log table.
pub fn format_table(raw: &str) -> String {
    parse_log_timestamp(raw)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Hourly aggregate key (`YYYY-MM-DDTHH`).
pub fn hour_bucket(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H").to_string()
}

/// Parse an hourly aggregate key back into the start of its hour.
pub fn parse_hour_bucket(key: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(&format!("{key}:00:00"), "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
