// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use logtrail::config::Config;
use logtrail::db::FirestoreDb;
use logtrail::routes::create_router;
use logtrail::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by an offline database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_app_with_config(Config::default())
}

/// Create a test app that requires `key` on log ingestion.
#[allow(dead_code)]
pub fn create_test_app_with_key(key: &str) -> (axum::Router, Arc<AppState>) {
    create_app_with_config(Config {
        ingest_api_key: Some(key.to_string()),
        ..Config::default()
    })
}

fn create_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config,
        db: FirestoreDb::new_mock(),
    });

    (create_router(state.clone()), state)
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// A complete, valid ingestion payload.
#[allow(dead_code)]
pub fn valid_log_json() -> serde_json::Value {
    serde_json::json!({
        "userId": "user-1",
        "level": "INFO",
        "message": "Application started",
        "timestamp": "2024-01-15 10:30:45.123",
        "tag": "startup",
        "threadId": 17,
        "processId": "4242",
        "packageName": "com.example.app"
    })
}
