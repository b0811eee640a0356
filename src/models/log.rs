// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Log record model for storage and ingestion.

use crate::error::AppError;
use crate::time_utils::{format_storage, parse_log_timestamp};
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Level name counted as an error by the dashboard.
pub const ERROR_LEVEL: &str = "error";

const RECORD_ID_BYTES: usize = 16;

/// Stored log record in Firestore (document ID is `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Random hex identifier
    pub id: String,
    /// Reporting user / device identifier
    pub user_id: String,
    /// Lower-case level name (debug, info, warning, error, ...)
    pub level: String,
    pub message: String,
    /// Storage-format RFC3339 timestamp
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

impl LogRecord {
    /// Generate a fresh random record ID.
    pub fn generate_id() -> Result<String, AppError> {
        let mut bytes = [0u8; RECORD_ID_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| anyhow::anyhow!("System random source unavailable"))?;
        Ok(hex::encode(bytes))
    }

    /// Parsed timestamp, if the stored value is readable.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_log_timestamp(&self.timestamp)
    }

    pub fn is_error(&self) -> bool {
        self.level == ERROR_LEVEL
    }
}

/// Log ingestion payload as sent by client SDKs.
///
/// Required fields are optional here so that a missing or null value can be
/// reported by name instead of as a generic parse failure.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLogEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    #[validate(length(max = 256))]
    pub user_id: Option<String>,
    #[validate(length(max = 32))]
    pub level: Option<String>,
    #[validate(length(max = 32768))]
    pub message: Option<String>,
    pub timestamp: Option<String>,
    #[validate(length(max = 256))]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    #[validate(length(max = 64))]
    pub thread_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    #[validate(length(max = 64))]
    pub process_id: Option<String>,
    #[validate(length(max = 256))]
    pub package_name: Option<String>,
}

impl NewLogEntry {
    /// Validate the payload and turn it into a storable record.
    pub fn into_record(self, id: String) -> Result<LogRecord, AppError> {
        self.validate()?;

        let user_id = required(self.user_id, "userId")?;
        let level = required(self.level, "level")?;
        let message = required(self.message, "message")?;
        let raw_timestamp = required(self.timestamp, "timestamp")?;

        let timestamp = parse_log_timestamp(&raw_timestamp).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid timestamp format: {raw_timestamp}. Expected 'YYYY-MM-DD HH:mm:ss', \
                 'YYYY-MM-DD HH:mm:ss.fff', or ISO 8601"
            ))
        })?;

        let record = LogRecord {
            id,
            user_id,
            level: level.trim().to_lowercase(),
            message,
            timestamp: format_storage(timestamp),
            tag: self.tag,
            thread_id: self.thread_id,
            process_id: self.process_id,
            package_name: self.package_name,
        };

        Ok(record)
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::BadRequest(format!("Missing required field: {field}")))
}

/// Accept either a JSON string or number (SDKs send numeric thread IDs).
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
