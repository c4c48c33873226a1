// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Row models for the spreadsheet tabs and the webhook event payload.

pub mod activity;
pub mod athlete;
pub mod event;
pub mod segment_effort;

pub use activity::{ActivityRow, ACTIVITY_HEADERS};
pub use athlete::{AthleteRow, ATHLETE_HEADERS};
pub use event::{InboxRow, WebhookEvent, INBOX_HEADERS};
pub use segment_effort::{SegmentEffortRow, SEGMENT_EFFORT_HEADERS};

/// Columns holding free text or text-shaped values. Cells under these
/// headers are written as strings even when they look numeric.
pub const TEXT_COLUMNS: [&str; 24] = [
    "name",
    "athlete_name",
    "description",
    "segment_name",
    "effort_name",
    "gear_id",
    "device_name",
    "access_token",
    "refresh_token",
    "sport_type",
    "type",
    "timezone",
    "visibility",
    "source",
    "start_date",
    "start_date_local",
    "updated_at",
    "week_start",
    "month",
    "received_at",
    "object_type",
    "aspect_type",
    "updates",
    "raw",
];

pub fn is_text_column(header: &str) -> bool {
    TEXT_COLUMNS.contains(&header)
}

/// Render a boolean the way Sheets displays them.
pub(crate) fn cell_bool(value: bool) -> String {
    if value { "TRUE" } else { "FALSE" }.to_string()
}

pub(crate) fn cell_opt_bool(value: Option<bool>) -> String {
    value.map(cell_bool).unwrap_or_default()
}

pub(crate) fn cell_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
