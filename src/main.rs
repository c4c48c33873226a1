// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Sheets Server
//!
//! Receives Strava webhooks and onboarding callbacks and mirrors athletes'
//! activities into a Google Sheets workbook.

use std::sync::Arc;
use strava_sheets::{
    config::Config,
    db::SheetsDb,
    services::{queue, ActivitySync, EventWorker, RetryPolicy, StravaClient, StravaService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Strava-Sheets");

    // Spreadsheet client
    let db = SheetsDb::new(&config).expect("Failed to configure Sheets client");
    if let Err(e) = db.ensure_schema().await {
        // Keep serving; /debug/sheets-ping retries the setup.
        tracing::warn!(error = %e, "Could not ensure spreadsheet tabs at startup");
    }

    let strava_service = StravaService::new(StravaClient::new(&config), db.clone());
    let sync = ActivitySync::new(strava_service.clone(), db.clone());

    // Event queue with a single worker
    let (event_queue, receiver) = queue::channel(config.queue_capacity, config.dead_letter_capacity);
    let worker = EventWorker::new(
        receiver,
        &event_queue,
        sync,
        db.clone(),
        RetryPolicy::from_config(&config),
    );
    tokio::spawn(worker.run());
    tracing::info!(capacity = config.queue_capacity, "Event queue initialized");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        strava_service,
        queue: event_queue,
    });

    // Build router
    let app = strava_sheets::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_sheets=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
