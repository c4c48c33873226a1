// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for webhook handling.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use strava_sheets::db::tabs;
use tower::ServiceExt;

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_webhook_verification() {
    let app = common::create_test_app().await;

    let challenge = "test_challenge_123";
    let verify_token = "test_verify_token"; // Matches Config::test_default()

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/webhook?hub.mode=subscribe&hub.challenge={}&hub.verify_token={}",
                    challenge, verify_token
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json, json!({"hub.challenge": challenge}));
}

#[tokio::test]
async fn test_webhook_verification_wrong_token() {
    let app = common::create_test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/webhook?hub.mode=subscribe&hub.challenge=abc&hub.verify_token=wrong_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_string(response).await;
    assert!(!body.contains("test_verify_token"), "expected token leaked: {body}");
    assert!(!body.contains("abc"));
}

#[tokio::test]
async fn test_webhook_verification_wrong_mode_or_missing_params() {
    let app = common::create_test_app().await;

    for uri in [
        "/webhook?hub.mode=unsubscribe&hub.challenge=abc&hub.verify_token=test_verify_token",
        "/webhook?hub.challenge=abc",
        "/webhook",
    ] {
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri {uri}");
    }
}

#[tokio::test]
async fn test_webhook_post_always_ok() {
    let app = common::create_test_app().await;

    let bodies = [
        common::activity_event("create", 1, 2).to_string(),
        "{not json".to_string(),
        String::new(),
        json!({"object_type": "activity"}).to_string(),
    ];

    for body in bodies {
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "body {body:?}");
    }

    assert_eq!(app.state.queue.depth(), 4);
}

#[tokio::test]
async fn test_webhook_post_is_processed_by_worker() {
    let mut app = common::create_test_app().await;
    common::seed_athlete(&app.db, 7, "refresh", 3600).await;
    app.strava
        .set_activity(common::activity_json(12345678901, 7, "Night Run"));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .body(Body::from(
                    common::activity_event("create", 12345678901, 7).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = app.worker.drain().await;
    assert_eq!(report.processed, 1);

    let mem = app.db.memory().unwrap();
    assert_eq!(mem.data_rows(tabs::INBOX).len(), 1);
    assert_eq!(mem.data_rows(tabs::ACTIVITIES).len(), 1);
    assert_eq!(mem.data_rows(tabs::SEGMENT_EFFORTS).len(), 2);
}

#[tokio::test]
async fn test_health_check() {
    let app = common::create_test_app().await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_landing_links_to_join() {
    let app = common::create_test_app().await;

    let response = app
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("href=\"/join\""));
}
