// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Segment effort rows, one per effort within an activity.

use super::cell_opt;
use crate::services::strava::{StravaActivity, StravaSegmentEffort};

pub const SEGMENT_EFFORT_HEADERS: [&str; 18] = [
    "activity_id",
    "athlete_id",
    "effort_id",
    "segment_id",
    "segment_name",
    "effort_name",
    "distance_m",
    "elapsed_time_s",
    "moving_time_s",
    "start_date_local",
    "average_heartrate",
    "max_heartrate",
    "average_cadence",
    "average_watts",
    "pr_rank",
    "kom_rank",
    "climb_category",
    "average_grade",
];

/// Segment effort row as written to the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEffortRow {
    pub activity_id: u64,
    pub athlete_id: u64,
    pub effort_id: u64,
    pub segment_id: Option<u64>,
    pub segment_name: String,
    pub effort_name: String,
    pub distance_m: f64,
    pub elapsed_time_s: Option<i64>,
    pub moving_time_s: Option<i64>,
    pub start_date_local: String,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub pr_rank: Option<u32>,
    pub kom_rank: Option<u32>,
    pub climb_category: Option<i32>,
    pub average_grade: Option<f64>,
}

impl SegmentEffortRow {
    pub fn from_strava(effort: &StravaSegmentEffort, activity_id: u64, athlete_id: u64) -> Self {
        let segment = effort.segment.as_ref();
        Self {
            activity_id,
            athlete_id,
            effort_id: effort.id,
            segment_id: segment.map(|s| s.id),
            segment_name: segment.and_then(|s| s.name.clone()).unwrap_or_default(),
            effort_name: effort.name.clone().unwrap_or_default(),
            distance_m: effort.distance.unwrap_or_default(),
            elapsed_time_s: effort.elapsed_time,
            moving_time_s: effort.moving_time,
            start_date_local: effort.start_date_local.clone().unwrap_or_default(),
            average_heartrate: effort.average_heartrate,
            max_heartrate: effort.max_heartrate,
            average_cadence: effort.average_cadence,
            average_watts: effort.average_watts,
            pr_rank: effort.pr_rank,
            kom_rank: effort.kom_rank,
            climb_category: segment.and_then(|s| s.climb_category),
            average_grade: segment.and_then(|s| s.average_grade),
        }
    }

    /// All effort rows for an activity, in the order Strava lists them.
    pub fn all_from_activity(activity: &StravaActivity, athlete_id: u64) -> Vec<Self> {
        activity
            .segment_efforts
            .iter()
            .map(|e| Self::from_strava(e, activity.id, athlete_id))
            .collect()
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.activity_id.to_string(),
            self.athlete_id.to_string(),
            self.effort_id.to_string(),
            cell_opt(self.segment_id),
            self.segment_name.clone(),
            self.effort_name.clone(),
            self.distance_m.to_string(),
            cell_opt(self.elapsed_time_s),
            cell_opt(self.moving_time_s),
            self.start_date_local.clone(),
            cell_opt(self.average_heartrate),
            cell_opt(self.max_heartrate),
            cell_opt(self.average_cadence),
            cell_opt(self.average_watts),
            cell_opt(self.pr_rank),
            cell_opt(self.kom_rank),
            cell_opt(self.climb_category),
            cell_opt(self.average_grade),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_nested_segment_fields() {
        let activity: StravaActivity = serde_json::from_value(json!({
            "id": 99,
            "name": "Hill repeats",
            "start_date": "2024-06-15T14:00:00Z",
            "start_date_local": "2024-06-15T07:00:00Z",
            "distance": 6000.0,
            "segment_efforts": [
                {
                    "id": 1001,
                    "name": "Old La Honda",
                    "elapsed_time": 1500,
                    "moving_time": 1490,
                    "start_date_local": "2024-06-15T07:10:00Z",
                    "distance": 4800.5,
                    "pr_rank": 2,
                    "segment": {
                        "id": 8109834,
                        "name": "Old La Honda (Bridge to Mailboxes)",
                        "climb_category": 3,
                        "average_grade": 7.9
                    }
                },
                { "id": 1002, "segment": { "id": 5 } }
            ]
        }))
        .unwrap();

        let rows = SegmentEffortRow::all_from_activity(&activity, 42);
        assert_eq!(rows.len(), 2);

        let first = rows[0].to_row();
        assert_eq!(first.len(), SEGMENT_EFFORT_HEADERS.len());
        assert_eq!(first[0], "99");
        assert_eq!(first[1], "42");
        assert_eq!(first[3], "8109834");
        assert_eq!(first[4], "Old La Honda (Bridge to Mailboxes)");
        assert_eq!(first[14], "2");
        assert_eq!(first[15], "");
        assert_eq!(first[16], "3");

        let second = &rows[1];
        assert_eq!(second.segment_id, Some(5));
        assert_eq!(second.segment_name, "");
        assert_eq!(second.distance_m, 0.0);
    }
}
