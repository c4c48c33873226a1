// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod queue;
pub mod strava;

pub use activity::{ActivitySync, SyncOutcome};
pub use queue::{DeadLetter, DrainReport, EventQueue, EventWorker, RetryPolicy};
pub use strava::{StravaClient, StravaService};
