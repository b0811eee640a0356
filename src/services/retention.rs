// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background deletion of logs older than the configured retention period.

use crate::db::{documents, FirestoreDb};
use crate::error::AppError;
use crate::models::settings::RetentionPeriod;
use crate::models::RetentionSettings;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Oldest timestamp kept under `period`.
pub fn cutoff(period: RetentionPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(period.days())
}

/// Periodically purges expired logs according to `settings/retention`.
#[derive(Clone)]
pub struct RetentionSweeper {
    db: FirestoreDb,
    interval: std::time::Duration,
}

impl RetentionSweeper {
    pub fn new(db: FirestoreDb, interval: std::time::Duration) -> Self {
        Self { db, interval }
    }

    /// Run one sweep. Returns the number of deleted records.
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let settings: RetentionSettings = self
            .db
            .get_or_init_settings(documents::RETENTION)
            .await?;

        if !settings.auto_delete_old_logs {
            tracing::debug!("Auto-delete disabled, skipping retention sweep");
            return Ok(0);
        }

        let cutoff = cutoff(settings.retention_period, Utc::now());
        let deleted = self.db.purge_logs_before(cutoff).await?;

        if deleted > 0 {
            tracing::info!(
                deleted,
                retention_period = %settings.retention_period,
                cutoff = %cutoff,
                "Retention sweep removed expired logs"
            );
        }

        Ok(deleted)
    }

    /// Sweep on a fixed interval until the runtime shuts down.
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub fn spawn(self) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Retention sweeper started"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::warn!(error = %e, "Retention sweep failed");
                }
            }
        })
    }
}
