// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ingest API key enforcement tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

const KEY: &str = "test-ingest-key";

fn post_log(auth: Option<(&str, String)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/logs")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((name, value)) = auth {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(common::valid_log_json().to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_missing_key_rejected() {
    let (app, _) = common::create_test_app_with_key(KEY);

    let response = app.oneshot(post_log(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = common::json_body(response).await;
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn test_wrong_key_rejected() {
    let (app, _) = common::create_test_app_with_key(KEY);

    let response = app
        .oneshot(post_log(Some(("x-api-key", "not-the-key".to_string()))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_key_prefix_rejected() {
    let (app, _) = common::create_test_app_with_key(KEY);

    let response = app
        .oneshot(post_log(Some(("x-api-key", KEY[..4].to_string()))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_key_header_accepted() {
    let (app, _) = common::create_test_app_with_key(KEY);

    let response = app
        .oneshot(post_log(Some(("x-api-key", KEY.to_string()))))
        .await
        .unwrap();

    // Past auth, the offline database fails the write
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let (app, _) = common::create_test_app_with_key(KEY);

    let response = app
        .oneshot(post_log(Some((
            header::AUTHORIZATION.as_str(),
            format!("Bearer {KEY}"),
        ))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_auth_checked_before_body() {
    let (app, _) = common::create_test_app_with_key(KEY);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logs")
                .body(Body::from("garbage"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_open_ingest_without_configured_key() {
    let (app, _) = common::create_test_app();

    let response = app.oneshot(post_log(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_reads_do_not_require_key() {
    let (app, _) = common::create_test_app_with_key(KEY);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/logs/table?startDate=bad")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Reaches validation rather than auth
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
