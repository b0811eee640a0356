// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Log ingestion and dashboard query routes.

use crate::db::LogQuery;
use crate::error::{AppError, Result};
use crate::models::stats::{PeakLogs, TopErrorTag};
use crate::models::{LogRecord, NewLogEntry};
use crate::services::{paginate, LogFilter, PageRequest, Pagination};
use crate::time_utils::{format_clock, format_storage, format_table};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_RECENT_LIMIT: i64 = 100;
const MAX_RECENT_LIMIT: i64 = 200;
const LOG_RATE_WINDOW_MINUTES: i64 = 10;

const CHART_LABEL: &str = "Log Activity";
const CHART_BORDER_COLOR: &str = "rgb(59, 130, 246)";
const CHART_BACKGROUND_COLOR: &str = "rgba(59, 130, 246, 0.5)";

/// Ingestion routes, wrapped in the ingest key check by the caller.
/// `/logs` and `/logs/` are both accepted for SDK compatibility.
pub fn ingest_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logs", post(create_log))
        .route("/logs/", post(create_log))
}

/// Dashboard read routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logs", get(list_logs))
        .route("/logs/", get(list_logs))
        .route("/logs/all", get(all_logs))
        .route("/logs/recent", get(recent_logs))
        .route("/logs/table", get(logs_table))
        .route("/logs/stats", get(dashboard_stats))
        .route("/logs/tags", get(tags))
}

/// Parse an optional integer query parameter.
fn parse_int(raw: Option<&str>, name: &str) -> Result<Option<i64>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                AppError::BadRequest(format!("Invalid '{name}' parameter: must be an integer"))
            })
        })
        .transpose()
}

// ─── Ingestion ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Store one log record sent by a client SDK.
async fn create_log(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<NewLogEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let Json(entry) = payload
        .map_err(|rejection| AppError::BadRequest(format!("Invalid log data: {rejection}")))?;

    let record = entry.into_record(LogRecord::generate_id()?)?;
    state.db.insert_log_atomic(&record).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Log stored".to_string(),
        }),
    ))
}

// ─── Raw Listing ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    user_id: Option<String>,
    level: Option<String>,
    tag: Option<String>,
    package_name: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

/// Logs matching exact-field filters, newest first.
async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<LogRecord>>> {
    let filter = LogFilter::default()
        .with_user_exact(params.user_id.as_deref())
        .with_level_exact(params.level.as_deref())
        .with_tag_exact(params.tag.as_deref())
        .with_package_name(params.package_name.as_deref())
        .with_range(
            params.start.as_deref(),
            params.end.as_deref(),
            ("start", "end"),
        )?;

    let records = state.db.query_logs(&filter.native_query(None)).await?;
    Ok(Json(filter.apply(records)))
}

async fn all_logs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<LogRecord>>> {
    Ok(Json(state.db.list_all_logs().await?))
}

// ─── Live Console ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentQuery {
    limit: Option<String>,
    user_id: Option<String>,
    levels: Option<String>,
}

/// One live console line.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLine {
    pub id: String,
    /// "HH:MM:SS"
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub user_id: String,
}

/// The newest matching logs, returned oldest first for appending to the
/// console.
async fn recent_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<Vec<ConsoleLine>>> {
    let limit = parse_int(params.limit.as_deref(), "limit")?
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT) as usize;

    let filter = LogFilter::default()
        .with_user_contains(params.user_id.as_deref())
        .with_levels(params.levels.as_deref());

    // A native limit is only safe when nothing is filtered in memory
    let native_limit = (!filter.has_residual()).then_some(limit as u32);
    let records = state.db.query_logs(&filter.native_query(native_limit)).await?;

    let mut lines: Vec<ConsoleLine> = filter
        .apply(records)
        .into_iter()
        .take(limit)
        .map(|r| ConsoleLine {
            id: r.id,
            timestamp: format_clock(&r.timestamp),
            level: r.level.to_lowercase(),
            message: r.message,
            user_id: r.user_id,
        })
        .collect();
    lines.reverse();

    tracing::debug!(count = lines.len(), limit, "Fetched recent logs");

    Ok(Json(lines))
}

// ─── Log Table ───────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableQuery {
    page: Option<String>,
    limit: Option<String>,
    levels: Option<String>,
    tags: Option<String>,
    user_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    search: Option<String>,
}

/// A log table row. Optional process fields are always present (as null)
/// so the table can render fixed columns.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub id: String,
    /// "YYYY-MM-DD HH:MM:SS"
    pub timestamp: String,
    pub user_id: String,
    pub level: String,
    pub tag: Option<String>,
    pub message: String,
    pub thread_id: Option<String>,
    pub process_id: Option<String>,
    pub package_name: Option<String>,
}

impl From<LogRecord> for TableRow {
    fn from(r: LogRecord) -> Self {
        Self {
            timestamp: format_table(&r.timestamp),
            id: r.id,
            user_id: r.user_id,
            level: r.level,
            tag: r.tag,
            message: r.message,
            thread_id: r.thread_id,
            process_id: r.process_id,
            package_name: r.package_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TableResponse {
    pub logs: Vec<TableRow>,
    pub pagination: Pagination,
}

/// One page of the filtered log table, newest first.
async fn logs_table(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableQuery>,
) -> Result<Json<TableResponse>> {
    let page = PageRequest::new(
        parse_int(params.page.as_deref(), "page")?,
        parse_int(params.limit.as_deref(), "limit")?,
    );

    let filter = LogFilter::default()
        .with_levels(params.levels.as_deref())
        .with_tags(params.tags.as_deref())
        .with_user_contains(params.user_id.as_deref())
        .with_search(params.search.as_deref())
        .with_range(
            params.start_date.as_deref(),
            params.end_date.as_deref(),
            ("startDate", "endDate"),
        )?;

    tracing::debug!(
        page = page.page,
        per_page = page.per_page,
        filter = ?filter,
        "Fetching log table"
    );

    let (rows, pagination) = match filter.native_page(page) {
        Some(query) => {
            let (total, rows) = tokio::try_join!(
                state.db.count_logs(&query),
                state.db.query_logs(&query)
            )?;
            (rows, Pagination::new(page, total))
        }
        None => {
            let records = state.db.query_logs(&filter.native_query(None)).await?;
            paginate(filter.apply(records), page)
        }
    };

    Ok(Json(TableResponse {
        logs: rows.into_iter().map(TableRow::from).collect(),
        pagination,
    }))
}

// ─── Dashboard Stats ─────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub errors: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_logs: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub unique_users: u64,
    pub top_error_tag: TopErrorTag,
    /// Logs per minute over the last ten minutes
    pub log_rate: f64,
    pub peak_logs: PeakLogs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<u64>,
    pub border_color: String,
    pub background_color: String,
}

#[derive(Debug, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub stats: DashboardStats,
    pub chart_data: ChartData,
}

/// Build the 24-hour activity chart from per-hour-of-day counts.
fn hourly_chart(data: [u64; 24]) -> ChartData {
    ChartData {
        labels: (0..24).map(|h| format!("{h:02}:00")).collect(),
        datasets: vec![ChartDataset {
            label: CHART_LABEL.to_string(),
            data: data.to_vec(),
            border_color: CHART_BORDER_COLOR.to_string(),
            background_color: CHART_BACKGROUND_COLOR.to_string(),
        }],
    }
}

/// Logs per minute, one decimal place.
fn log_rate(count: u64) -> f64 {
    (count as f64 / LOG_RATE_WINDOW_MINUTES as f64 * 10.0).round() / 10.0
}

/// Dashboard KPIs and the hourly activity chart.
///
/// Counters come from the `log_stats` aggregate (1 read); the log rate is a
/// count aggregation over the recent window.
async fn dashboard_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>> {
    let now = Utc::now();
    let window = LogQuery {
        since: Some(format_storage(now - Duration::minutes(LOG_RATE_WINDOW_MINUTES))),
        ..LogQuery::default()
    };

    let (stats, recent) =
        tokio::try_join!(state.db.get_log_stats(), state.db.count_logs(&window))?;
    let stats = stats.unwrap_or_default();

    Ok(Json(StatsResponse {
        stats: DashboardStats {
            errors: stats.error_logs,
            total_logs: stats.total_logs,
            unique_users: stats.unique_users,
            top_error_tag: stats.top_error_tag(),
            log_rate: log_rate(recent),
            peak_logs: stats.peak_hour(),
        },
        chart_data: hourly_chart(stats.hourly_activity(now)),
    }))
}

// ─── Tags ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// Distinct tags for the filter dropdown, sorted.
async fn tags(State(state): State<Arc<AppState>>) -> Result<Json<TagsResponse>> {
    let stats = state.db.get_log_stats().await?.unwrap_or_default();
    Ok(Json(TagsResponse {
        tags: stats.tag_names(),
    }))
}
