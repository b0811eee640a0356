// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation tests for the log routes.
//!
//! The test app runs against an offline database, so a request that passes
//! validation surfaces as a 500 `database_error`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

fn post_log(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/logs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = common::create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = common::json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_ingest_rejects_non_json_body() {
    let (app, _) = common::create_test_app();

    let response = app.oneshot(post_log("not json at all")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::json_body(response).await;
    assert_eq!(json["error"], "bad_request");
    assert!(json["details"]
        .as_str()
        .unwrap()
        .starts_with("Invalid log data"));
}

#[tokio::test]
async fn test_ingest_reports_missing_field_by_name() {
    for field in ["userId", "level", "message", "timestamp"] {
        let (app, _) = common::create_test_app();
        let mut payload = common::valid_log_json();
        payload.as_object_mut().unwrap().remove(field);

        let response = app.oneshot(post_log(payload.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "field {field}");
        let json = common::json_body(response).await;
        assert_eq!(
            json["details"],
            format!("Missing required field: {field}"),
            "field {field}"
        );
    }
}

#[tokio::test]
async fn test_ingest_null_field_is_missing() {
    let (app, _) = common::create_test_app();
    let mut payload = common::valid_log_json();
    payload["message"] = serde_json::Value::Null;

    let response = app.oneshot(post_log(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::json_body(response).await;
    assert_eq!(json["details"], "Missing required field: message");
}

#[tokio::test]
async fn test_ingest_invalid_timestamp() {
    let (app, _) = common::create_test_app();
    let mut payload = common::valid_log_json();
    payload["timestamp"] = "yesterday afternoon".into();

    let response = app.oneshot(post_log(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::json_body(response).await;
    assert!(json["details"]
        .as_str()
        .unwrap()
        .contains("Invalid timestamp format"));
}

#[tokio::test]
async fn test_ingest_user_id_too_long() {
    let (app, _) = common::create_test_app();
    let mut payload = common::valid_log_json();
    payload["userId"] = "u".repeat(257).into();

    let response = app.oneshot(post_log(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::json_body(response).await;
    assert_eq!(json["details"], "Invalid length for: userId");
}

#[tokio::test]
async fn test_ingest_valid_payload_reaches_database() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(post_log(common::valid_log_json().to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = common::json_body(response).await;
    assert_eq!(json["error"], "database_error");
    assert!(json.get("details").is_none(), "DB errors must not leak detail");
}

#[tokio::test]
async fn test_ingest_accepts_empty_user_and_level() {
    let (app, _) = common::create_test_app();
    let mut payload = common::valid_log_json();
    payload["userId"] = "".into();
    payload["level"] = "".into();

    let response = app.oneshot(post_log(payload.to_string())).await.unwrap();

    // Passes validation; the offline database is the first failure
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = common::json_body(response).await;
    assert_eq!(json["error"], "database_error");
}

#[tokio::test]
async fn test_ingest_trailing_slash_route() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logs/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_date_filters() {
    for uri in [
        "/logs?start=invalid-date",
        "/logs/?end=2024-13-45",
        "/logs/table?startDate=not-a-date",
        "/logs/table?endDate=soon",
    ] {
        let (app, _) = common::create_test_app();

        let response = app.oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_non_numeric_paging_params() {
    for uri in [
        "/logs/table?page=two",
        "/logs/table?limit=ten",
        "/logs/recent?limit=lots",
    ] {
        let (app, _) = common::create_test_app();

        let response = app.oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn test_valid_queries_reach_database() {
    for uri in [
        "/logs?userId=user-1&level=error",
        "/logs/all",
        "/logs/recent?limit=500&levels=error,warn",
        "/logs/table?page=0&limit=1000&search=%28unbalanced%5B",
        "/logs/table?levels=l0,l1,l2,l3,l4,l5,l6,l7,l8,l9,l10,l11,l12,l13,l14,l15,\
         l16,l17,l18,l19,l20,l21,l22,l23,l24,l25,l26,l27,l28,l29,l30",
        "/logs?tag=Net,UI&level=error",
        "/logs/stats",
        "/logs/tags",
    ] {
        let (app, _) = common::create_test_app();

        let response = app.oneshot(get(uri)).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "{uri}"
        );
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _) = common::create_test_app();

    let response = app.oneshot(get("/logs/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = common::json_body(response).await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["details"], "/logs/nope");
}

#[tokio::test]
async fn test_security_headers_present() {
    let (app, _) = common::create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/logs")
                .header(header::ORIGIN, state.config.frontend_url.as_str())
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-api-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        state.config.frontend_url.as_str()
    );
}
