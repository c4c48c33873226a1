// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and the calendar values derived
//! from an activity's local start time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};

/// Hour at or after which an activity counts as a night run.
pub const NIGHT_START_HOUR: u32 = 22;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Parse Strava's `start_date_local`.
///
/// Strava suffixes local times with `Z` even though they carry no zone, so
/// the suffix (or any offset) is discarded and the wall-clock time kept.
pub fn parse_local_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    let trimmed = raw.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Calendar values derived from a local start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCalendar {
    pub local_hour: u32,
    pub is_night: bool,
    /// Sunday that starts the week containing the start date.
    pub week_start: NaiveDate,
    /// `YYYY-MM`
    pub month: String,
}

impl LocalCalendar {
    pub fn from_local(start: NaiveDateTime) -> Self {
        let local_hour = start.hour();
        Self {
            local_hour,
            is_night: local_hour >= NIGHT_START_HOUR,
            week_start: week_start_sunday(start.date()),
            month: format!("{:04}-{:02}", start.year(), start.month()),
        }
    }

    pub fn week_start_string(&self) -> String {
        self.week_start.format("%Y-%m-%d").to_string()
    }
}

/// Start date minus the day of week, counting Sunday as day zero.
pub fn week_start_sunday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strava_local_with_z_suffix() {
        let dt = parse_local_timestamp("2024-06-15T23:10:00Z").unwrap();
        assert_eq!(dt.hour(), 23);
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn parse_local_without_suffix() {
        let dt = parse_local_timestamp("2024-06-15T07:05:30").unwrap();
        assert_eq!(dt.hour(), 7);
        assert_eq!(dt.minute(), 5);
    }

    #[test]
    fn parse_garbage_is_none() {
        assert!(parse_local_timestamp("yesterday").is_none());
        assert!(parse_local_timestamp("").is_none());
    }

    #[test]
    fn late_saturday_night_run() {
        let start = parse_local_timestamp("2024-06-15T23:10:00").unwrap();
        let cal = LocalCalendar::from_local(start);
        assert_eq!(cal.local_hour, 23);
        assert!(cal.is_night);
        assert_eq!(cal.week_start_string(), "2024-06-09");
        assert_eq!(cal.month, "2024-06");
    }

    #[test]
    fn night_boundary_is_inclusive() {
        let at_22 = parse_local_timestamp("2024-01-03T22:00:00").unwrap();
        let at_21 = parse_local_timestamp("2024-01-03T21:59:59").unwrap();
        assert!(LocalCalendar::from_local(at_22).is_night);
        assert!(!LocalCalendar::from_local(at_21).is_night);
    }

    #[test]
    fn sunday_is_its_own_week_start() {
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        assert_eq!(week_start_sunday(sunday), sunday);
    }

    #[test]
    fn week_start_crosses_month_and_year() {
        // Wednesday 2025-01-01 -> Sunday 2024-12-29
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            week_start_sunday(date),
            NaiveDate::from_ymd_opt(2024, 12, 29).unwrap()
        );
    }

    #[test]
    fn format_utc_uses_z_suffix() {
        let dt = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(format_utc_rfc3339(dt), "1970-01-01T00:00:00Z");
    }
}
