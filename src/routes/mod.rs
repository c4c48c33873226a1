// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod debug;
pub mod webhook;

use crate::AppState;
use axum::{response::Html, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

const LANDING_PAGE: &str = "<!doctype html>\
<html><head><title>Strava to Sheets</title></head><body>\
<h1>Strava to Sheets</h1>\
<p>Connect your Strava account to have new activities logged to the team spreadsheet.</p>\
<ul>\
<li><a href=\"/join\">Connect with Strava</a></li>\
<li><a href=\"/health\">Health</a></li>\
</ul>\
</body></html>";

async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Liveness check
async fn health_check() -> &'static str {
    "ok"
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(webhook::routes())
        .merge(debug::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
