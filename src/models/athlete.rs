// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Athlete row with stored OAuth tokens.

/// Seconds before expiry at which an access token is treated as stale.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

pub const ATHLETE_HEADERS: [&str; 6] = [
    "athlete_id",
    "athlete_name",
    "access_token",
    "refresh_token",
    "expires_at",
    "updated_at",
];

/// One row of the `athletes` tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthleteRow {
    pub athlete_id: u64,
    pub athlete_name: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    pub updated_at: String,
}

impl AthleteRow {
    /// Whether the access token must be refreshed before use at `now` (unix seconds).
    pub fn needs_refresh(&self, now: i64) -> bool {
        self.access_token.is_empty() || self.expires_at - now < TOKEN_REFRESH_MARGIN_SECS
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.athlete_id.to_string(),
            self.athlete_name.clone(),
            self.access_token.clone(),
            self.refresh_token.clone(),
            self.expires_at.to_string(),
            self.updated_at.clone(),
        ]
    }

    /// Parse a row read back from the sheet, addressed through its header row.
    ///
    /// Returns `None` when the id cell is not a number.
    pub fn from_cells(headers: &[String], cells: &[String]) -> Option<Self> {
        let get = |name: &str| -> String {
            headers
                .iter()
                .position(|h| h == name)
                .and_then(|idx| cells.get(idx))
                .map(|c| c.trim().to_string())
                .unwrap_or_default()
        };

        Some(Self {
            athlete_id: crate::db::parse_id(&get("athlete_id"))?,
            athlete_name: get("athlete_name"),
            access_token: get("access_token"),
            refresh_token: get("refresh_token"),
            expires_at: crate::db::parse_id(&get("expires_at")).map_or(0, |v| v as i64),
            updated_at: get("updated_at"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn athlete(expires_at: i64) -> AthleteRow {
        AthleteRow {
            athlete_id: 42,
            athlete_name: "Ada Runner".to_string(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
            updated_at: String::new(),
        }
    }

    #[test]
    fn refresh_inside_margin() {
        let now = 1_700_000_000;
        assert!(athlete(now + 30).needs_refresh(now));
        assert!(athlete(now - 10).needs_refresh(now));
        assert!(!athlete(now + 120).needs_refresh(now));
    }

    #[test]
    fn empty_access_token_always_refreshes() {
        let now = 1_700_000_000;
        let mut a = athlete(now + 3600);
        a.access_token.clear();
        assert!(a.needs_refresh(now));
    }

    #[test]
    fn cells_are_read_by_header_name() {
        let headers: Vec<String> = ["expires_at", "athlete_id", "access_token"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cells: Vec<String> = ["1700000000", "4.2E1", "tok"].iter().map(|s| s.to_string()).collect();

        let parsed = AthleteRow::from_cells(&headers, &cells).unwrap();
        assert_eq!(parsed.athlete_id, 42);
        assert_eq!(parsed.expires_at, 1_700_000_000);
        assert_eq!(parsed.access_token, "tok");
        assert_eq!(parsed.refresh_token, "");
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let headers = vec!["athlete_id".to_string()];
        let cells = vec!["abc".to_string()];
        assert!(AthleteRow::from_cells(&headers, &cells).is_none());
    }

    #[test]
    fn to_row_matches_header_width() {
        assert_eq!(athlete(0).to_row().len(), ATHLETE_HEADERS.len());
    }
}
