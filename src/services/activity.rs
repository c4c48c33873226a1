// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity sync service.
//!
//! Applies one webhook event to the spreadsheet:
//! 1. create: fetch the detailed activity and append activity + effort rows
//! 2. update: re-fetch and overwrite, falling back to patching cells
//! 3. delete: remove the activity row and its effort rows
//! 4. athlete deauthorization: clear stored tokens

use crate::db::{tabs, DeleteSummary, SheetsDb};
use crate::error::Result;
use crate::models::{ActivityRow, SegmentEffortRow, WebhookEvent};
use crate::services::StravaService;
use crate::time_utils::format_utc_rfc3339;

const SOURCE_WEBHOOK: &str = "webhook";
const SOURCE_REFETCH: &str = "update";

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created {
        activity_id: u64,
        segment_efforts: usize,
    },
    AlreadyPresent {
        activity_id: u64,
    },
    Updated {
        activity_id: u64,
        /// False when the webhook `updates` were patched in instead.
        refetched: bool,
    },
    Deleted {
        activity_id: u64,
        summary: DeleteSummary,
    },
    Deauthorized {
        athlete_id: u64,
    },
    /// Nothing written; the reason is logged.
    Skipped {
        reason: String,
    },
    /// Event type this service does not track.
    Ignored,
}

impl SyncOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        SyncOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

/// Applies webhook events to the row store.
#[derive(Clone)]
pub struct ActivitySync {
    strava: StravaService,
    db: SheetsDb,
}

impl ActivitySync {
    pub fn new(strava: StravaService, db: SheetsDb) -> Self {
        Self { strava, db }
    }

    /// Dispatch an event by object and aspect type.
    ///
    /// Errors are transient failures (spreadsheet or Strava unavailable) and
    /// are worth retrying; permanent conditions come back as `Skipped`.
    pub async fn handle(&self, event: &WebhookEvent) -> Result<SyncOutcome> {
        if event.is_deauthorization() {
            return self.deauthorize(event.object_id).await;
        }
        if !event.is_activity() {
            tracing::debug!(
                object_type = %event.object_type,
                aspect_type = %event.aspect_type,
                "Ignoring non-activity event"
            );
            return Ok(SyncOutcome::Ignored);
        }

        match event.aspect_type.as_str() {
            "create" => self.create(event.owner_id, event.object_id).await,
            "update" => self.update(event).await,
            "delete" => self.delete(event.object_id).await,
            other => {
                tracing::warn!(aspect_type = other, activity_id = event.object_id, "Unknown aspect type");
                Ok(SyncOutcome::Ignored)
            }
        }
    }

    /// Fetch and append a new activity. No-op if the id already has a row.
    pub async fn create(&self, athlete_id: u64, activity_id: u64) -> Result<SyncOutcome> {
        if self.db.activity_exists(activity_id).await? {
            tracing::debug!(athlete_id, activity_id, "Activity already stored (idempotent skip)");
            return Ok(SyncOutcome::AlreadyPresent { activity_id });
        }

        let activity = match self.strava.get_activity(athlete_id, activity_id).await {
            Ok(Some(activity)) => activity,
            Ok(None) => {
                tracing::warn!(athlete_id, activity_id, "No valid token, skipping create");
                return Ok(SyncOutcome::skipped("no valid token"));
            }
            Err(e) if e.is_strava_not_found() || e.is_strava_token_error() => {
                tracing::warn!(athlete_id, activity_id, error = %e, "Activity not fetchable, skipping create");
                return Ok(SyncOutcome::skipped(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let now = format_utc_rfc3339(chrono::Utc::now());
        let row = ActivityRow::from_strava(&activity, athlete_id, SOURCE_WEBHOOK, &now);
        let efforts = SegmentEffortRow::all_from_activity(&activity, row.athlete_id);

        self.db.insert_activity(&row, &efforts).await?;

        tracing::info!(
            athlete_id,
            activity_id,
            segment_efforts = efforts.len(),
            is_night_run = ?row.is_night_run,
            is_5k_plus = row.is_5k_plus,
            "Activity stored"
        );

        Ok(SyncOutcome::Created {
            activity_id,
            segment_efforts: efforts.len(),
        })
    }

    /// Refresh an existing activity row from Strava.
    pub async fn update(&self, event: &WebhookEvent) -> Result<SyncOutcome> {
        let athlete_id = event.owner_id;
        let activity_id = event.object_id;

        let row = match self.db.find_activity_row(activity_id).await? {
            Some(row) => row,
            None => {
                tracing::info!(athlete_id, activity_id, "Updated activity not stored yet, creating");
                let created = self.create(athlete_id, activity_id).await?;
                // A row written by create already reflects the latest fetch.
                if self.db.find_activity_row(activity_id).await?.is_some() {
                    return Ok(created);
                }
                tracing::warn!(athlete_id, activity_id, "Activity still missing after create, giving up");
                return Ok(SyncOutcome::skipped("activity missing after create"));
            }
        };

        match self.strava.get_activity(athlete_id, activity_id).await {
            Ok(Some(activity)) => {
                let now = format_utc_rfc3339(chrono::Utc::now());
                let mapped = ActivityRow::from_strava(&activity, athlete_id, SOURCE_REFETCH, &now);
                let efforts = SegmentEffortRow::all_from_activity(&activity, mapped.athlete_id);

                self.db.overwrite_activity(row, &mapped).await?;
                self.db.replace_segment_efforts(activity_id, &efforts).await?;

                tracing::info!(athlete_id, activity_id, row, "Activity row refreshed");
                Ok(SyncOutcome::Updated {
                    activity_id,
                    refetched: true,
                })
            }
            Ok(None) => self.patch_from_updates(row, event).await,
            Err(e) if e.is_strava_not_found() || e.is_strava_token_error() => {
                tracing::warn!(athlete_id, activity_id, error = %e, "Refetch failed, patching from webhook");
                self.patch_from_updates(row, event).await
            }
            Err(e) => Err(e),
        }
    }

    /// Write the fields carried by the webhook directly into the row.
    async fn patch_from_updates(&self, row: u32, event: &WebhookEvent) -> Result<SyncOutcome> {
        let patches = update_patches(event);
        if patches.is_empty() {
            tracing::info!(activity_id = event.object_id, "No patchable fields in update");
            return Ok(SyncOutcome::skipped("no valid token and no patchable fields"));
        }

        for (header, value) in &patches {
            self.db
                .update_cell(tabs::ACTIVITIES, row, header, value.clone())
                .await?;
        }
        self.db
            .update_cell(
                tabs::ACTIVITIES,
                row,
                "updated_at",
                format_utc_rfc3339(chrono::Utc::now()),
            )
            .await?;

        tracing::info!(
            activity_id = event.object_id,
            row,
            fields = patches.len(),
            "Activity row patched from webhook updates"
        );
        Ok(SyncOutcome::Updated {
            activity_id: event.object_id,
            refetched: false,
        })
    }

    /// Remove the activity and its segment efforts.
    pub async fn delete(&self, activity_id: u64) -> Result<SyncOutcome> {
        let summary = self.db.delete_activity(activity_id).await?;
        if summary == DeleteSummary::default() {
            tracing::info!(activity_id, "Deleted activity was not stored");
        } else {
            tracing::info!(
                activity_id,
                activities = summary.activities,
                segment_efforts = summary.segment_efforts,
                "Activity deleted"
            );
        }
        Ok(SyncOutcome::Deleted {
            activity_id,
            summary,
        })
    }

    /// Clear stored tokens for an athlete who revoked access.
    pub async fn deauthorize(&self, athlete_id: u64) -> Result<SyncOutcome> {
        let Some((row, mut athlete)) = self.db.get_athlete(athlete_id).await? else {
            tracing::info!(athlete_id, "Deauthorized athlete not stored");
            return Ok(SyncOutcome::skipped("athlete not stored"));
        };

        athlete.access_token.clear();
        athlete.refresh_token.clear();
        athlete.expires_at = 0;
        athlete.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.db.update_athlete(row, &athlete).await?;

        tracing::info!(athlete_id, "Athlete deauthorized, tokens cleared");
        Ok(SyncOutcome::Deauthorized { athlete_id })
    }
}

/// Cells to write for the fields present in an update event.
fn update_patches(event: &WebhookEvent) -> Vec<(&'static str, String)> {
    let mut patches = Vec::new();

    if let Some(title) = event.update_str("title") {
        patches.push(("name", title));
    }
    if let Some(kind) = event.update_str("type") {
        patches.push(("type", kind.clone()));
        if event.update_str("sport_type").is_none() {
            patches.push(("sport_type", kind));
        }
    }
    if let Some(sport) = event.update_str("sport_type") {
        patches.push(("sport_type", sport));
    }
    if let Some(private) = event.update_str("private") {
        let private = private.eq_ignore_ascii_case("true");
        patches.push(("private", if private { "TRUE" } else { "FALSE" }.to_string()));
        patches.push((
            "visibility",
            if private { "only_me" } else { "everyone" }.to_string(),
        ));
    }

    patches
}
