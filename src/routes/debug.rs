// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operator diagnostics.

use crate::db::sheets::SCHEMA;
use crate::error::Result;
use crate::services::DeadLetter;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/debug/sheets-ping", get(sheets_ping))
        .route("/debug/env", get(env_report))
        .route("/debug/queue", get(queue_report))
}

// ─── Sheets ──────────────────────────────────────────────────

#[derive(Serialize)]
struct TabReport {
    tab: &'static str,
    columns: usize,
}

#[derive(Serialize)]
struct SheetsPingResponse {
    ok: bool,
    spreadsheet_id: String,
    tabs: Vec<TabReport>,
}

/// Ensure every tab exists and report its header width.
async fn sheets_ping(State(state): State<Arc<AppState>>) -> Result<Json<SheetsPingResponse>> {
    state.db.ensure_schema().await?;

    let mut tabs = Vec::with_capacity(SCHEMA.len());
    for (tab, _) in SCHEMA {
        let columns = state.db.headers(tab).await?.len();
        tabs.push(TabReport { tab, columns });
    }

    Ok(Json(SheetsPingResponse {
        ok: true,
        spreadsheet_id: state.config.spreadsheet_id.clone(),
        tabs,
    }))
}

// ─── Environment ─────────────────────────────────────────────

/// Configuration summary. Secrets only appear as "is set" flags.
#[derive(Serialize)]
struct EnvReport {
    strava_client_id: String,
    strava_redirect_uri: String,
    strava_client_secret_set: bool,
    webhook_verify_token_set: bool,
    oauth_state_key_set: bool,
    google_service_account_email: String,
    google_private_key_set: bool,
    spreadsheet_id: String,
    strava_api_base: String,
    sheets_api_base: String,
    queue_capacity: usize,
    queue_max_attempts: u32,
}

async fn env_report(State(state): State<Arc<AppState>>) -> Json<EnvReport> {
    let config = &state.config;
    Json(EnvReport {
        strava_client_id: config.strava_client_id.clone(),
        strava_redirect_uri: config.strava_redirect_uri.clone(),
        strava_client_secret_set: !config.strava_client_secret.is_empty(),
        webhook_verify_token_set: !config.webhook_verify_token.is_empty(),
        oauth_state_key_set: !config.oauth_state_key.is_empty(),
        google_service_account_email: config.google_service_account_email.clone(),
        google_private_key_set: !config.google_private_key.is_empty(),
        spreadsheet_id: config.spreadsheet_id.clone(),
        strava_api_base: config.strava_api_base.clone(),
        sheets_api_base: config.sheets_api_base.clone(),
        queue_capacity: config.queue_capacity,
        queue_max_attempts: config.queue_max_attempts,
    })
}

// ─── Queue ───────────────────────────────────────────────────

#[derive(Serialize)]
struct QueueReport {
    depth: usize,
    capacity: usize,
    dead_letter_count: usize,
    dead_letters: Vec<DeadLetter>,
}

async fn queue_report(State(state): State<Arc<AppState>>) -> Json<QueueReport> {
    let dead_letters = state.queue.dead_letters().snapshot();
    Json(QueueReport {
        depth: state.queue.depth(),
        capacity: state.queue.capacity(),
        dead_letter_count: dead_letters.len(),
        dead_letters,
    })
}
