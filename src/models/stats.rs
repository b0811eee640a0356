//! Log statistics aggregate for efficient dashboard queries.
//!
//! The aggregate is updated in the same transaction that stores each log
//! record, so the dashboard reads one document instead of scanning the
//! `logs` collection. Distinct users are counted through one small
//! `log_users` document per user, so the aggregate stays bounded no matter
//! how many devices report.

use chrono::{DateTime, Duration, Timelike, Utc};
use ring::digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::LogRecord;
use crate::time_utils::{format_storage, hour_bucket, parse_hour_bucket};

/// Hourly buckets older than this are dropped (longest retention period).
pub const HOURLY_BUCKET_RETENTION_DAYS: i64 = 90;

/// Distinct tags tracked per map. With 256-byte tags the two tag maps stay
/// well under Firestore's 1 MiB document limit.
pub const MAX_TRACKED_TAGS: usize = 500;

/// Pre-computed statistics over all stored logs.
///
/// Stored at: `log_stats/aggregate`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    /// Total records stored
    #[serde(default)]
    pub total_logs: u64,
    /// Records with level `error`
    #[serde(default)]
    pub error_logs: u64,
    /// Number of `log_users` documents
    #[serde(default)]
    pub unique_users: u64,
    /// Record count per tag (sorted for the filter dropdown)
    #[serde(default)]
    pub tags: BTreeMap<String, u64>,
    /// Error record count per tag
    #[serde(default)]
    pub error_tags: BTreeMap<String, u64>,
    /// Record count per hour ("YYYY-MM-DDTHH" keys)
    #[serde(default)]
    pub hourly: BTreeMap<String, u64>,
    /// Last update timestamp (storage format)
    #[serde(default)]
    pub updated_at: String,
}

/// Record count for one user ID.
///
/// Stored at: `log_users/{doc_id(user_id)}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLogCount {
    pub user_id: String,
    pub count: u64,
}

impl UserLogCount {
    /// Document ID for a user. User IDs may contain `/` and may exceed the
    /// document ID length limit once escaped, so they are hashed.
    pub fn doc_id(user_id: &str) -> String {
        hex::encode(digest::digest(&digest::SHA256, user_id.as_bytes()))
    }
}

/// Most common tag among error records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TopErrorTag {
    pub tag: String,
    /// Share of all error records, rounded to a whole percent
    pub percentage: u32,
}

/// Busiest hour on record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PeakLogs {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub count: u64,
    /// Hour of day, "HH:00"
    pub time: String,
}

/// Count one more occurrence of `key`. New keys are only added while the
/// map holds fewer than `MAX_TRACKED_TAGS` entries.
fn bump(map: &mut BTreeMap<String, u64>, key: &str) {
    if let Some(count) = map.get_mut(key) {
        *count += 1;
    } else if map.len() < MAX_TRACKED_TAGS {
        map.insert(key.to_string(), 1);
    }
}

/// Count one less occurrence of `key`, removing it at zero.
fn drop_one(map: &mut BTreeMap<String, u64>, key: &str) {
    if let Some(count) = map.get_mut(key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            map.remove(key);
        }
    }
}

impl LogStats {
    /// Fold one newly stored record into the aggregate.
    ///
    /// Users are tracked separately (see [`UserLogCount`]).
    pub fn record(&mut self, log: &LogRecord, now: DateTime<Utc>) {
        self.total_logs += 1;

        if let Some(tag) = &log.tag {
            bump(&mut self.tags, tag);
        }

        if log.is_error() {
            self.error_logs += 1;
            if let Some(tag) = &log.tag {
                bump(&mut self.error_tags, tag);
            }
        }

        if let Some(ts) = log.parsed_timestamp() {
            *self.hourly.entry(hour_bucket(ts)).or_insert(0) += 1;
        }

        self.prune_hourly(now);
        self.updated_at = format_storage(now);
    }

    /// Remove a deleted record from the aggregate. Counters never go below
    /// zero; empty buckets and tags disappear.
    pub fn forget(&mut self, log: &LogRecord, now: DateTime<Utc>) {
        self.total_logs = self.total_logs.saturating_sub(1);

        if let Some(tag) = &log.tag {
            drop_one(&mut self.tags, tag);
        }

        if log.is_error() {
            self.error_logs = self.error_logs.saturating_sub(1);
            if let Some(tag) = &log.tag {
                drop_one(&mut self.error_tags, tag);
            }
        }

        if let Some(ts) = log.parsed_timestamp() {
            drop_one(&mut self.hourly, &hour_bucket(ts));
        }

        self.prune_hourly(now);
        self.updated_at = format_storage(now);
    }

    /// Keys sort chronologically, so everything before the cutoff key goes.
    fn prune_hourly(&mut self, now: DateTime<Utc>) {
        let cutoff = hour_bucket(now - Duration::days(HOURLY_BUCKET_RETENTION_DAYS));
        self.hourly = self.hourly.split_off(&cutoff);
    }

    /// Distinct tags, sorted.
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub fn top_error_tag(&self) -> TopErrorTag {
        let top = self
            .error_tags
            .iter()
            .max_by(|(a_tag, a), (b_tag, b)| a.cmp(b).then_with(|| b_tag.cmp(a_tag)));

        match top {
            Some((tag, &count)) if self.error_logs > 0 => TopErrorTag {
                tag: tag.clone(),
                percentage: (count as f64 / self.error_logs as f64 * 100.0).round() as u32,
            },
            _ => TopErrorTag {
                tag: "none".to_string(),
                percentage: 0,
            },
        }
    }

    /// Busiest hourly bucket; ties go to the earliest hour.
    pub fn peak_hour(&self) -> PeakLogs {
        let mut peak: Option<(&String, u64)> = None;
        for (key, &count) in &self.hourly {
            if peak.is_none_or(|(_, best)| count > best) {
                peak = Some((key, count));
            }
        }

        peak.and_then(|(key, count)| {
            parse_hour_bucket(key).map(|start| PeakLogs {
                count,
                time: start.format("%H:00").to_string(),
            })
        })
        .unwrap_or_else(|| PeakLogs {
            count: 0,
            time: "00:00".to_string(),
        })
    }

    /// Counts for the 24 most recent hours (current hour included), indexed
    /// by hour of day.
    pub fn hourly_activity(&self, now: DateTime<Utc>) -> [u64; 24] {
        let mut data = [0u64; 24];
        for offset in 0..24 {
            let hour = now - Duration::hours(offset);
            if let Some(count) = self.hourly.get(&hour_bucket(hour)) {
                data[hour.hour() as usize] += count;
            }
        }
        data
    }
}
