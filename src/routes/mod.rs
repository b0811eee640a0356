// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod logs;
pub mod settings;

use crate::error::AppError;
use crate::middleware::ingest_auth::API_KEY_HEADER;
use crate::middleware::require_ingest_key;
use crate::AppState;
use axum::http::{header, request::Parts, HeaderName, HeaderValue, Method, Uri};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

/// Whether a browser origin may call the API: the configured frontend, or a
/// local development server on any port.
fn origin_allowed(origin: &str, frontend_url: &str) -> bool {
    if origin == frontend_url {
        return true;
    }
    ["http://localhost", "http://127.0.0.1"].iter().any(|local| {
        origin
            .strip_prefix(local)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
    })
}

fn cors_layer(frontend_url: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request_parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origin_allowed(origin, &frontend_url))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(API_KEY_HEADER),
        ])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let ingest_routes = logs::ingest_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_ingest_key));

    Router::new()
        .route("/health", get(health_check))
        .merge(ingest_routes)
        .merge(logs::routes())
        .merge(settings::routes())
        .fallback(not_found)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors_layer(state.config.frontend_url.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_allowed() {
        let frontend = "https://logs.example.com";
        assert!(origin_allowed(frontend, frontend));
        assert!(origin_allowed("http://localhost:5173", frontend));
        assert!(origin_allowed("http://127.0.0.1", frontend));
        assert!(!origin_allowed("http://localhost.evil.com", frontend));
        assert!(!origin_allowed("https://logs.example.com.evil.com", frontend));
    }
}
