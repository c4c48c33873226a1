// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Sheets: log Strava activities to a Google Sheets workbook
//!
//! This crate provides the webhook receiver and OAuth onboarding flow that
//! keep a spreadsheet of athletes, activities and segment efforts in sync
//! with Strava.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SheetsDb;
use services::{EventQueue, StravaService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SheetsDb,
    pub strava_service: StravaService,
    pub queue: EventQueue,
}
