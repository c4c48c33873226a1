// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Strava events.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", get(verify).post(handle_event))
}

/// Strava webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
}

/// Verification response.
#[derive(Serialize)]
struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    challenge: String,
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>> {
    let token_matches = params.verify_token.as_deref().is_some_and(|token| {
        bool::from(
            token
                .as_bytes()
                .ct_eq(state.config.webhook_verify_token.as_bytes()),
        )
    });

    if params.mode.as_deref() == Some("subscribe") && token_matches {
        tracing::info!("Webhook subscription verified");
        return Ok(Json(VerifyResponse {
            challenge: params.challenge.unwrap_or_default(),
        }));
    }

    tracing::warn!(
        mode = ?params.mode,
        "Webhook verification failed: invalid mode or token"
    );
    Err(AppError::Forbidden)
}

/// Handle incoming webhook events (POST).
///
/// Always acknowledges with 200; the payload is processed by the queue worker.
async fn handle_event(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    let payload = serde_json::from_slice::<serde_json::Value>(&body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Webhook body is not JSON, queueing raw text");
        serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
    });

    tracing::info!(
        payload = %payload,
        queue_depth = state.queue.depth(),
        "Webhook event received"
    );

    state.queue.enqueue(payload);

    // Always return 200 OK quickly (Strava requirement)
    StatusCode::OK
}
