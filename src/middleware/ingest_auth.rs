// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-key authentication for log ingestion.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header carrying the ingest key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware guarding log ingestion.
///
/// When `INGEST_API_KEY` is configured the request must present it in
/// `X-Api-Key` or as an `Authorization: Bearer` token. Without a configured
/// key every request passes.
pub async fn require_ingest_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = state.config.ingest_api_key.as_deref() {
        let presented = presented_key(request.headers()).ok_or(AppError::Unauthorized)?;

        if !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            tracing::warn!("Rejected log ingestion with invalid API key");
            return Err(AppError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|h| h.to_str().ok()) {
        return Some(key.trim());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}
