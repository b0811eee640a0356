// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Logs (ingested records, queried newest first)
//! - Log stats (the dashboard aggregate and per-user counts, updated
//!   transactionally)
//! - Settings (retention and live console documents)

use crate::db::{collections, documents};
use crate::error::AppError;
use crate::models::{LiveConsoleSettings, LogRecord, LogStats, RetentionSettings, UserLogCount};
use crate::time_utils::format_storage;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

// Firestore limits a transaction to 500 writes. A purge batch writes one
// delete per record, at most one user document per record, and the
// aggregate.
const PURGE_BATCH_SIZE: usize = 200;

/// The subset of a log filter Firestore evaluates natively.
///
/// Timestamps are storage-format strings; their lexicographic order is
/// chronological. Results are always ordered newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    /// Inclusive lower bound
    pub since: Option<String>,
    /// Inclusive upper bound
    pub until: Option<String>,
    /// Exclusive upper bound
    pub before: Option<String>,
    /// Level must be one of these (empty = any, at most 30 values)
    pub levels: Vec<String>,
    pub user_id: Option<String>,
    pub tag: Option<String>,
    pub package_name: Option<String>,
    /// Records to skip before the first result
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl LogQuery {
    fn firestore_filter(
        &self,
        q: firestore::select_filter_builder::FirestoreQueryFilterBuilder,
    ) -> Option<firestore::FirestoreQueryFilter> {
        q.for_all([
            self.since
                .clone()
                .and_then(|v| q.field("timestamp").greater_than_or_equal(v)),
            self.until
                .clone()
                .and_then(|v| q.field("timestamp").less_than_or_equal(v)),
            self.before
                .clone()
                .and_then(|v| q.field("timestamp").less_than(v)),
            if self.levels.is_empty() {
                None
            } else {
                q.field("level").is_in(self.levels.clone())
            },
            self.user_id.clone().and_then(|v| q.field("userId").eq(v)),
            self.tag.clone().and_then(|v| q.field("tag").eq(v)),
            self.package_name
                .clone()
                .and_then(|v| q.field("packageName").eq(v)),
        ])
    }
}

/// Result row of a count aggregation.
#[derive(Debug, Deserialize)]
struct LogCount {
    count: u64,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Bootstrap ──────────────────────────────────────────────

    /// Create the default settings documents and the empty stats aggregate
    /// if they do not exist yet.
    ///
    /// Collections are created implicitly by the first write; the composite
    /// index used by level-filtered queries is declared in
    /// `firestore.indexes.json`.
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        let retention: RetentionSettings = self.get_or_init_settings(documents::RETENTION).await?;
        let console: LiveConsoleSettings =
            self.get_or_init_settings(documents::LIVE_CONSOLE).await?;

        if self.get_log_stats().await?.is_none() {
            self.set_log_stats(&LogStats::default()).await?;
            tracing::info!("Created empty log stats aggregate");
        }

        tracing::info!(
            retention_period = %retention.retention_period,
            auto_delete = retention.auto_delete_old_logs,
            refresh_interval = %console.auto_refresh_interval,
            "Database bootstrap complete"
        );
        Ok(())
    }

    // ─── Log Operations ─────────────────────────────────────────

    /// Query logs with native filters, newest first.
    pub async fn query_logs(&self, query: &LogQuery) -> Result<Vec<LogRecord>, AppError> {
        let native = query.clone();

        let select = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LOGS)
            .filter(move |q| native.firestore_filter(q))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)]);

        let select = match query.offset {
            Some(offset) => select.offset(offset),
            None => select,
        };
        let select = match query.limit {
            Some(limit) => select.limit(limit),
            None => select,
        };

        select
            .obj()
            .query()
            .await
            .map_err(AppError::from)
    }

    /// Number of logs matching the query's filters, counted by Firestore.
    ///
    /// `offset` and `limit` are ignored.
    pub async fn count_logs(&self, query: &LogQuery) -> Result<u64, AppError> {
        let native = query.clone();

        let counts: Vec<LogCount> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LOGS)
            .filter(move |q| native.firestore_filter(q))
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await?;

        Ok(counts.first().map_or(0, |c| c.count))
    }

    /// Every stored log, newest first.
    pub async fn list_all_logs(&self) -> Result<Vec<LogRecord>, AppError> {
        self.query_logs(&LogQuery::default()).await
    }

    /// Atomically store a log record and fold it into the stats aggregate
    /// and the per-user count.
    ///
    /// The aggregate and the user document are read inside the transaction.
    /// When a concurrent ingest commits first, this transaction is aborted
    /// and retried against the new values, so no increment is lost.
    pub async fn insert_log_atomic(&self, record: &LogRecord) -> Result<(), AppError> {
        let client = self.get_client()?;
        let record = record.clone();
        let user_doc_id = UserLogCount::doc_id(&record.user_id);

        client
            .run_transaction(|db, transaction| {
                let record = record.clone();
                let user_doc_id = user_doc_id.clone();

                Box::pin(async move {
                    let mut stats: LogStats = db
                        .fluent()
                        .select()
                        .by_id_in(collections::LOG_STATS)
                        .obj()
                        .one(documents::STATS_AGGREGATE)
                        .await?
                        .unwrap_or_default();

                    let existing: Option<UserLogCount> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::LOG_USERS)
                        .obj()
                        .one(&user_doc_id)
                        .await?;

                    let user = match existing {
                        Some(mut user) => {
                            user.count += 1;
                            user
                        }
                        None => {
                            stats.unique_users += 1;
                            UserLogCount {
                                user_id: record.user_id.clone(),
                                count: 1,
                            }
                        }
                    };
                    stats.record(&record, Utc::now());

                    db.fluent()
                        .update()
                        .in_col(collections::LOGS)
                        .document_id(&record.id)
                        .object(&record)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::LOG_USERS)
                        .document_id(&user_doc_id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::LOG_STATS)
                        .document_id(documents::STATS_AGGREGATE)
                        .object(&stats)
                        .add_to_transaction(transaction)?;

                    Ok(())
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Log transaction failed: {}", e)))?;

        tracing::debug!(
            log_id = %record.id,
            level = %record.level,
            user_id = %record.user_id,
            "Log stored"
        );

        Ok(())
    }

    /// Delete every log older than `cutoff`, removing each from the
    /// aggregate and the per-user counts in the same transaction.
    ///
    /// Returns the number of deleted records.
    pub async fn purge_logs_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let expired = self
            .query_logs(&LogQuery {
                before: Some(format_storage(cutoff)),
                ..LogQuery::default()
            })
            .await?;

        if expired.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0;
        for chunk in expired.chunks(PURGE_BATCH_SIZE) {
            let ids: Vec<String> = chunk.iter().map(|record| record.id.clone()).collect();
            deleted += self.delete_logs(ids).await?;
        }

        tracing::info!(
            expired = expired.len(),
            deleted,
            "Log purge complete"
        );

        Ok(deleted)
    }

    /// Delete one batch of logs in a transaction. Records already gone
    /// (deleted by another sweeper) are skipped so they are not subtracted
    /// twice.
    async fn delete_logs(&self, ids: Vec<String>) -> Result<usize, AppError> {
        let client = self.get_client()?;

        client
            .run_transaction(|db, transaction| {
                let ids = ids.clone();

                Box::pin(async move {
                    let now = Utc::now();

                    let found: Vec<(String, Option<LogRecord>)> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::LOGS)
                        .obj()
                        .batch(ids)
                        .await?
                        .collect()
                        .await;
                    let records: Vec<LogRecord> =
                        found.into_iter().filter_map(|(_, record)| record).collect();

                    let mut stats: LogStats = db
                        .fluent()
                        .select()
                        .by_id_in(collections::LOG_STATS)
                        .obj()
                        .one(documents::STATS_AGGREGATE)
                        .await?
                        .unwrap_or_default();

                    let mut removed_per_user: BTreeMap<String, u64> = BTreeMap::new();
                    for record in &records {
                        stats.forget(record, now);
                        *removed_per_user.entry(record.user_id.clone()).or_insert(0) += 1;
                    }

                    for (user_id, removed) in removed_per_user {
                        let doc_id = UserLogCount::doc_id(&user_id);
                        let existing: Option<UserLogCount> = db
                            .fluent()
                            .select()
                            .by_id_in(collections::LOG_USERS)
                            .obj()
                            .one(&doc_id)
                            .await?;
                        let Some(mut user) = existing else {
                            continue;
                        };

                        user.count = user.count.saturating_sub(removed);
                        if user.count == 0 {
                            db.fluent()
                                .delete()
                                .from(collections::LOG_USERS)
                                .document_id(&doc_id)
                                .add_to_transaction(transaction)?;
                            stats.unique_users = stats.unique_users.saturating_sub(1);
                        } else {
                            db.fluent()
                                .update()
                                .in_col(collections::LOG_USERS)
                                .document_id(&doc_id)
                                .object(&user)
                                .add_to_transaction(transaction)?;
                        }
                    }

                    for record in &records {
                        db.fluent()
                            .delete()
                            .from(collections::LOGS)
                            .document_id(&record.id)
                            .add_to_transaction(transaction)?;
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::LOG_STATS)
                        .document_id(documents::STATS_AGGREGATE)
                        .object(&stats)
                        .add_to_transaction(transaction)?;

                    Ok(records.len())
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit log deletion: {}", e)))
    }

    // ─── Stats Operations ───────────────────────────────────────

    pub async fn get_log_stats(&self) -> Result<Option<LogStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LOG_STATS)
            .obj()
            .one(documents::STATS_AGGREGATE)
            .await
            .map_err(AppError::from)
    }

    pub async fn set_log_stats(&self, stats: &LogStats) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::LOG_STATS)
            .document_id(documents::STATS_AGGREGATE)
            .object(stats)
            .execute()
            .await?;
        Ok(())
    }

    /// Stored record count for one user ID.
    pub async fn get_user_log_count(
        &self,
        user_id: &str,
    ) -> Result<Option<UserLogCount>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LOG_USERS)
            .obj()
            .one(&UserLogCount::doc_id(user_id))
            .await
            .map_err(AppError::from)
    }

    // ─── Settings Operations ────────────────────────────────────

    /// Read a settings document.
    pub async fn get_settings<T>(&self, doc_id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SETTINGS)
            .obj()
            .one(doc_id)
            .await
            .map_err(AppError::from)
    }

    /// Create or replace a settings document.
    pub async fn set_settings<T>(&self, doc_id: &str, settings: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SETTINGS)
            .document_id(doc_id)
            .object(settings)
            .execute()
            .await?;
        Ok(())
    }

    /// Read a settings document, persisting the defaults on first access.
    pub async fn get_or_init_settings<T>(&self, doc_id: &str) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync,
    {
        if let Some(settings) = self.get_settings(doc_id).await? {
            return Ok(settings);
        }

        let defaults = T::default();
        self.set_settings(doc_id, &defaults).await?;
        tracing::info!(document = doc_id, "Stored default settings");
        Ok(defaults)
    }
}
