// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity row: one per Strava activity in the `activities` tab.

use super::{cell_bool, cell_opt, cell_opt_bool};
use crate::services::strava::StravaActivity;
use crate::time_utils::{parse_local_timestamp, LocalCalendar};

/// Distance at or above which an activity counts as 5k+.
pub const FIVE_K_METERS: f64 = 5000.0;

/// Header row of the `activities` tab. Column order matches [`ActivityRow::to_row`].
pub const ACTIVITY_HEADERS: [&str; 41] = [
    "activity_id",
    "athlete_id",
    "name",
    "sport_type",
    "type",
    "start_date",
    "start_date_local",
    "timezone",
    "distance_m",
    "moving_time_s",
    "elapsed_time_s",
    "total_elevation_gain_m",
    "average_speed_mps",
    "max_speed_mps",
    "average_heartrate",
    "max_heartrate",
    "average_cadence",
    "average_watts",
    "kilojoules",
    "calories",
    "suffer_score",
    "achievement_count",
    "kudos_count",
    "comment_count",
    "pr_count",
    "private",
    "visibility",
    "gear_id",
    "device_name",
    "commute",
    "trainer",
    "manual",
    "segment_effort_count",
    "description",
    "updated_at",
    "is_night_run",
    "is_5k_plus",
    "local_hour",
    "week_start",
    "month",
    "source",
];

/// Activity row as written to the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub activity_id: u64,
    pub athlete_id: u64,
    pub name: String,
    pub sport_type: String,
    pub activity_type: String,
    pub start_date: String,
    pub start_date_local: String,
    pub timezone: String,
    pub distance_m: f64,
    pub moving_time_s: Option<i64>,
    pub elapsed_time_s: Option<i64>,
    pub total_elevation_gain_m: Option<f64>,
    pub average_speed_mps: Option<f64>,
    pub max_speed_mps: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub kilojoules: Option<f64>,
    pub calories: Option<f64>,
    pub suffer_score: Option<f64>,
    pub achievement_count: Option<u32>,
    pub kudos_count: Option<u32>,
    pub comment_count: Option<u32>,
    pub pr_count: Option<u32>,
    pub private: Option<bool>,
    pub visibility: String,
    pub gear_id: String,
    pub device_name: String,
    pub commute: Option<bool>,
    pub trainer: Option<bool>,
    pub manual: Option<bool>,
    pub segment_effort_count: usize,
    pub description: String,
    pub updated_at: String,
    // Derived from start_date_local
    pub is_night_run: Option<bool>,
    pub is_5k_plus: bool,
    pub local_hour: Option<u32>,
    pub week_start: String,
    pub month: String,
    /// "webhook" when written by create, "update" when rewritten by a refetch
    pub source: String,
}

impl ActivityRow {
    /// Map a detailed Strava activity to a row.
    ///
    /// `athlete_id` is the webhook owner; it is used when the payload omits
    /// the athlete reference. Calendar fields stay empty if the local start
    /// time cannot be parsed.
    pub fn from_strava(
        activity: &StravaActivity,
        athlete_id: u64,
        source: &str,
        updated_at: &str,
    ) -> Self {
        let calendar = parse_local_timestamp(&activity.start_date_local).map(LocalCalendar::from_local);

        Self {
            activity_id: activity.id,
            athlete_id: activity.athlete.as_ref().map_or(athlete_id, |a| a.id),
            name: activity.name.clone(),
            sport_type: activity.sport_type.clone().unwrap_or_default(),
            activity_type: activity.activity_type.clone().unwrap_or_default(),
            start_date: activity.start_date.clone(),
            start_date_local: activity.start_date_local.clone(),
            timezone: activity.timezone.clone().unwrap_or_default(),
            distance_m: activity.distance,
            moving_time_s: activity.moving_time,
            elapsed_time_s: activity.elapsed_time,
            total_elevation_gain_m: activity.total_elevation_gain,
            average_speed_mps: activity.average_speed,
            max_speed_mps: activity.max_speed,
            average_heartrate: activity.average_heartrate,
            max_heartrate: activity.max_heartrate,
            average_cadence: activity.average_cadence,
            average_watts: activity.average_watts,
            kilojoules: activity.kilojoules,
            calories: activity.calories,
            suffer_score: activity.suffer_score,
            achievement_count: activity.achievement_count,
            kudos_count: activity.kudos_count,
            comment_count: activity.comment_count,
            pr_count: activity.pr_count,
            private: activity.private,
            visibility: activity.visibility.clone().unwrap_or_default(),
            gear_id: activity.gear_id.clone().unwrap_or_default(),
            device_name: activity.device_name.clone().unwrap_or_default(),
            commute: activity.commute,
            trainer: activity.trainer,
            manual: activity.manual,
            segment_effort_count: activity.segment_efforts.len(),
            description: activity.description.clone().unwrap_or_default(),
            updated_at: updated_at.to_string(),
            is_night_run: calendar.as_ref().map(|c| c.is_night),
            is_5k_plus: activity.distance >= FIVE_K_METERS,
            local_hour: calendar.as_ref().map(|c| c.local_hour),
            week_start: calendar
                .as_ref()
                .map(LocalCalendar::week_start_string)
                .unwrap_or_default(),
            month: calendar.map(|c| c.month).unwrap_or_default(),
            source: source.to_string(),
        }
    }

    /// Cells in [`ACTIVITY_HEADERS`] order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.activity_id.to_string(),
            self.athlete_id.to_string(),
            self.name.clone(),
            self.sport_type.clone(),
            self.activity_type.clone(),
            self.start_date.clone(),
            self.start_date_local.clone(),
            self.timezone.clone(),
            self.distance_m.to_string(),
            cell_opt(self.moving_time_s),
            cell_opt(self.elapsed_time_s),
            cell_opt(self.total_elevation_gain_m),
            cell_opt(self.average_speed_mps),
            cell_opt(self.max_speed_mps),
            cell_opt(self.average_heartrate),
            cell_opt(self.max_heartrate),
            cell_opt(self.average_cadence),
            cell_opt(self.average_watts),
            cell_opt(self.kilojoules),
            cell_opt(self.calories),
            cell_opt(self.suffer_score),
            cell_opt(self.achievement_count),
            cell_opt(self.kudos_count),
            cell_opt(self.comment_count),
            cell_opt(self.pr_count),
            cell_opt_bool(self.private),
            self.visibility.clone(),
            self.gear_id.clone(),
            self.device_name.clone(),
            cell_opt_bool(self.commute),
            cell_opt_bool(self.trainer),
            cell_opt_bool(self.manual),
            self.segment_effort_count.to_string(),
            self.description.clone(),
            self.updated_at.clone(),
            cell_opt_bool(self.is_night_run),
            cell_bool(self.is_5k_plus),
            cell_opt(self.local_hour),
            self.week_start.clone(),
            self.month.clone(),
            self.source.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture(start_local: &str, distance: f64) -> StravaActivity {
        serde_json::from_value(json!({
            "id": 12345678901_u64,
            "name": "Late loop",
            "sport_type": "Run",
            "type": "Run",
            "start_date": "2024-06-16T06:10:00Z",
            "start_date_local": start_local,
            "timezone": "(GMT-08:00) America/Los_Angeles",
            "distance": distance,
            "moving_time": 2400,
            "elapsed_time": 2500,
            "average_heartrate": 151.2,
            "private": false,
            "visibility": "everyone",
            "athlete": { "id": 42 },
            "segment_efforts": []
        }))
        .unwrap()
    }

    fn cell<'a>(row: &'a [String], header: &str) -> &'a str {
        let idx = ACTIVITY_HEADERS.iter().position(|h| *h == header).unwrap();
        &row[idx]
    }

    #[test]
    fn row_width_matches_headers() {
        let row = ActivityRow::from_strava(&fixture("2024-06-15T23:10:00Z", 8000.0), 42, "webhook", "now");
        assert_eq!(row.to_row().len(), ACTIVITY_HEADERS.len());
    }

    #[test]
    fn derived_fields_for_late_saturday_run() {
        let row = ActivityRow::from_strava(&fixture("2024-06-15T23:10:00Z", 8000.0), 42, "webhook", "now")
            .to_row();

        assert_eq!(cell(&row, "is_night_run"), "TRUE");
        assert_eq!(cell(&row, "is_5k_plus"), "TRUE");
        assert_eq!(cell(&row, "local_hour"), "23");
        assert_eq!(cell(&row, "week_start"), "2024-06-09");
        assert_eq!(cell(&row, "month"), "2024-06");
        assert_eq!(cell(&row, "distance_m"), "8000");
    }

    #[test]
    fn short_morning_run_flags() {
        let row = ActivityRow::from_strava(&fixture("2024-06-12T06:30:00Z", 4999.9), 42, "webhook", "now");
        assert_eq!(row.is_night_run, Some(false));
        assert!(!row.is_5k_plus);
        assert_eq!(row.local_hour, Some(6));
    }

    #[test]
    fn exactly_five_k_counts() {
        let row = ActivityRow::from_strava(&fixture("2024-06-12T06:30:00Z", 5000.0), 42, "webhook", "now");
        assert!(row.is_5k_plus);
    }

    #[test]
    fn unparseable_start_leaves_calendar_blank() {
        let row = ActivityRow::from_strava(&fixture("not a date", 100.0), 42, "webhook", "now").to_row();
        assert_eq!(cell(&row, "local_hour"), "");
        assert_eq!(cell(&row, "is_night_run"), "");
        assert_eq!(cell(&row, "week_start"), "");
    }

    #[test]
    fn optional_metrics_render_empty() {
        let row = ActivityRow::from_strava(&fixture("2024-06-12T06:30:00Z", 100.0), 42, "webhook", "now").to_row();
        assert_eq!(cell(&row, "average_heartrate"), "151.2");
        assert_eq!(cell(&row, "max_heartrate"), "");
        assert_eq!(cell(&row, "private"), "FALSE");
        assert_eq!(cell(&row, "athlete_id"), "42");
    }

    #[test]
    fn falls_back_to_owner_id_without_athlete_ref() {
        let mut activity = fixture("2024-06-12T06:30:00Z", 100.0);
        activity.athlete = None;
        let row = ActivityRow::from_strava(&activity, 7, "webhook", "now");
        assert_eq!(row.athlete_id, 7);
    }
}
