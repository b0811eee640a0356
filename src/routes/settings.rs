// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard settings routes.

use crate::db::documents;
use crate::error::{AppError, Result};
use crate::models::settings::{MaxLogsToDisplay, RefreshInterval, RetentionPeriod};
use crate::models::{LiveConsoleSettings, RetentionSettings};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/settings/retention",
            get(get_retention).put(update_retention),
        )
        .route(
            "/settings/live-console",
            get(get_live_console).put(update_live_console),
        )
}

/// Settings bodies are validated field by field so each problem gets its
/// own message, instead of one serde error for the whole document.
fn settings_body(
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>> {
    match payload {
        Ok(Json(Value::Object(map))) if !map.is_empty() => Ok(map),
        _ => Err(AppError::BadRequest("No data provided".to_string())),
    }
}

fn required<'a>(body: &'a Map<String, Value>, fields: [&str; 2]) -> Result<[&'a Value; 2]> {
    let get = |name: &str| body.get(name).filter(|v| !v.is_null());
    match (get(fields[0]), get(fields[1])) {
        (Some(a), Some(b)) => Ok([a, b]),
        _ => Err(AppError::BadRequest(format!(
            "Both {} and {} are required",
            fields[0], fields[1]
        ))),
    }
}

/// Parse a string-valued option. Numbers are accepted in their decimal form.
fn option_value<T>(value: &Value, field: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(AppError::BadRequest(format!("{field} must be a string"))),
    };
    raw.parse()
        .map_err(|e| AppError::BadRequest(format!("Invalid {field}: {e}")))
}

// ─── Retention ───────────────────────────────────────────────

async fn get_retention(State(state): State<Arc<AppState>>) -> Result<Json<RetentionSettings>> {
    let settings = state
        .db
        .get_or_init_settings(documents::RETENTION)
        .await?;
    Ok(Json(settings))
}

async fn update_retention(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<RetentionSettings>> {
    let body = settings_body(payload)?;
    let [period, auto_delete] = required(&body, ["retentionPeriod", "autoDeleteOldLogs"])?;

    let retention_period: RetentionPeriod = option_value(period, "retentionPeriod")?;
    let auto_delete_old_logs = auto_delete.as_bool().ok_or_else(|| {
        AppError::BadRequest("autoDeleteOldLogs must be a boolean value".to_string())
    })?;

    let settings = RetentionSettings {
        retention_period,
        auto_delete_old_logs,
    };
    state
        .db
        .set_settings(documents::RETENTION, &settings)
        .await?;

    tracing::info!(
        retention_period = %settings.retention_period,
        auto_delete = settings.auto_delete_old_logs,
        "Retention settings updated"
    );

    Ok(Json(settings))
}

// ─── Live Console ────────────────────────────────────────────

async fn get_live_console(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LiveConsoleSettings>> {
    let settings = state
        .db
        .get_or_init_settings(documents::LIVE_CONSOLE)
        .await?;
    Ok(Json(settings))
}

async fn update_live_console(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<LiveConsoleSettings>> {
    let body = settings_body(payload)?;
    let [interval, max_logs] = required(&body, ["autoRefreshInterval", "maxLogsToDisplay"])?;

    let settings = LiveConsoleSettings {
        auto_refresh_interval: option_value::<RefreshInterval>(interval, "autoRefreshInterval")?,
        max_logs_to_display: option_value::<MaxLogsToDisplay>(max_logs, "maxLogsToDisplay")?,
    };
    state
        .db
        .set_settings(documents::LIVE_CONSOLE, &settings)
        .await?;

    tracing::info!(
        refresh_interval = %settings.auto_refresh_interval,
        max_logs = %settings.max_logs_to_display,
        "Live console settings updated"
    );

    Ok(Json(settings))
}
