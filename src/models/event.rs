// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava webhook event payload and its audit row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const INBOX_HEADERS: [&str; 9] = [
    "received_at",
    "object_type",
    "aspect_type",
    "object_id",
    "owner_id",
    "event_time",
    "subscription_id",
    "updates",
    "raw",
];

/// Strava webhook event payload.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub object_type: String, // "activity" or "athlete"
    pub object_id: u64,
    pub aspect_type: String, // "create", "update", "delete"
    pub owner_id: u64,
    #[serde(default)]
    pub subscription_id: Option<u64>,
    #[serde(default)]
    pub event_time: Option<i64>,
    /// Changed fields for updates; `{"authorized": "false"}` on deauthorization
    #[serde(default)]
    pub updates: Option<HashMap<String, serde_json::Value>>,
}

impl WebhookEvent {
    pub fn is_activity(&self) -> bool {
        self.object_type == "activity"
    }

    /// Strava sends: object_type="athlete", aspect_type="update", updates={"authorized": "false"}
    pub fn is_deauthorization(&self) -> bool {
        self.object_type == "athlete"
            && self.aspect_type == "update"
            && self
                .updates
                .as_ref()
                .and_then(|u| u.get("authorized"))
                .is_some_and(|v| v.as_bool() == Some(false) || v.as_str() == Some("false"))
    }

    pub fn update_str(&self, key: &str) -> Option<String> {
        match self.updates.as_ref()?.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Audit row for the `inbox` tab. Written for every payload, parseable or not.
#[derive(Debug, Clone)]
pub struct InboxRow {
    pub received_at: String,
    pub raw: serde_json::Value,
}

impl InboxRow {
    pub fn to_row(&self) -> Vec<String> {
        let field = |key: &str| -> String {
            match self.raw.get(key) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        };

        vec![
            self.received_at.clone(),
            field("object_type"),
            field("aspect_type"),
            field("object_id"),
            field("owner_id"),
            field("event_time"),
            field("subscription_id"),
            field("updates"),
            self.raw.to_string(),
        ]
    }
}
