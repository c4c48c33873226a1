// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for OAuth and activity fetching.
//!
//! Handles:
//! - Authorization code exchange on `/join-callback`
//! - Detailed activity fetching (with all segment efforts)
//! - Token refresh when the stored token is about to expire

use crate::config::{Config, STRAVA_SCOPE};
use crate::error::AppError;
use serde::Deserialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            http,
            api_base: config.strava_api_base.clone(),
            oauth_base: config.strava_oauth_base.clone(),
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
        }
    }

    /// URL of the Strava consent page.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&response_type=code&approval_prompt=auto&scope={}&state={}",
            self.oauth_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(STRAVA_SCOPE),
            urlencoding::encode(state),
        )
    }

    /// Get a detailed activity by ID, including every segment effort.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<StravaActivity, AppError> {
        let url = format!("{}/activities/{}", self.api_base, activity_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("include_all_efforts", "true")])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Strava rejected token refresh");
            return Err(AppError::StravaApi(
                AppError::STRAVA_REFRESH_REJECTED.to_string(),
            ));
        }

        self.check_response_json(response).await
    }

    /// Exchange an authorization code for tokens and the athlete summary.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::OAuthExchange(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            return Err(AppError::OAuthExchange(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuthExchange(format!("Failed to parse token response: {}", e)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::StravaApi(AppError::STRAVA_RATE_LIMIT.to_string()));
            }

            if status.as_u16() == 401 {
                return Err(AppError::StravaApi(
                    AppError::STRAVA_TOKEN_ERROR.to_string(),
                ));
            }

            tracing::warn!(status = %status, body = %body, "Strava API request failed");
            return Err(AppError::StravaApi(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

impl StravaAthlete {
    pub fn display_name(&self) -> String {
        [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Athlete reference embedded in an activity.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthleteRef {
    pub id: u64,
}

/// Detailed Strava activity response.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sport_type: Option<String>,
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub start_date_local: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub moving_time: Option<i64>,
    #[serde(default)]
    pub elapsed_time: Option<i64>,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    #[serde(default)]
    pub average_speed: Option<f64>,
    #[serde(default)]
    pub max_speed: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub kilojoules: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub suffer_score: Option<f64>,
    #[serde(default)]
    pub achievement_count: Option<u32>,
    #[serde(default)]
    pub kudos_count: Option<u32>,
    #[serde(default)]
    pub comment_count: Option<u32>,
    #[serde(default)]
    pub pr_count: Option<u32>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub gear_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub commute: Option<bool>,
    #[serde(default)]
    pub trainer: Option<bool>,
    #[serde(default)]
    pub manual: Option<bool>,
    #[serde(default)]
    pub athlete: Option<StravaAthleteRef>,
    #[serde(default)]
    pub segment_efforts: Vec<StravaSegmentEffort>,
}

/// Segment effort within a detailed activity.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaSegmentEffort {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub elapsed_time: Option<i64>,
    #[serde(default)]
    pub moving_time: Option<i64>,
    #[serde(default)]
    pub start_date_local: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    #[serde(default)]
    pub max_heartrate: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub pr_rank: Option<u32>,
    #[serde(default)]
    pub kom_rank: Option<u32>,
    #[serde(default)]
    pub segment: Option<StravaSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StravaSegment {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub climb_category: Option<i32>,
    #[serde(default)]
    pub average_grade: Option<f64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

use crate::db::SheetsDb;
use crate::models::AthleteRow;
use crate::time_utils::{format_utc_rfc3339, now_unix};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared refresh locks, one per athlete.
pub type RefreshLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// High-level Strava service that manages the token lifecycle.
///
/// Tokens live in the `athletes` tab; a token expiring within 60 seconds is
/// refreshed and written back before use.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    db: SheetsDb,
    /// Per-athlete mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
}

impl StravaService {
    pub fn new(client: StravaClient, db: SheetsDb) -> Self {
        Self {
            client,
            db,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a usable access token for the athlete, refreshing if needed.
    ///
    /// `Ok(None)` means there is no token to use: the athlete is unknown, has
    /// no refresh token, or Strava rejected the refresh. Callers skip the
    /// operation for this athlete. Spreadsheet failures and token endpoint
    /// outages (transport errors, 5xx, 429) are returned as errors.
    pub async fn get_valid_access_token(&self, athlete_id: u64) -> Result<Option<String>, AppError> {
        let lock = self
            .refresh_locks
            .entry(athlete_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let Some((row, mut athlete)) = self.db.get_athlete(athlete_id).await? else {
            tracing::warn!(athlete_id, "No stored tokens for athlete");
            return Ok(None);
        };

        if !athlete.needs_refresh(now_unix()) {
            return Ok(Some(athlete.access_token));
        }

        if athlete.refresh_token.is_empty() {
            tracing::warn!(athlete_id, "Access token expired and no refresh token stored");
            return Ok(None);
        }

        tracing::info!(athlete_id, expires_at = athlete.expires_at, "Access token expiring, refreshing");

        let refreshed = match self.client.refresh_token(&athlete.refresh_token).await {
            Ok(t) => t,
            Err(e) if e.is_strava_refresh_rejected() => {
                tracing::warn!(athlete_id, "Token refresh rejected");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(athlete_id, error = %e, "Token refresh failed");
                return Err(e);
            }
        };

        athlete.access_token = refreshed.access_token;
        athlete.refresh_token = refreshed.refresh_token;
        athlete.expires_at = refreshed.expires_at;
        athlete.updated_at = format_utc_rfc3339(chrono::Utc::now());

        self.db.update_athlete(row, &athlete).await?;

        tracing::info!(athlete_id, expires_at = athlete.expires_at, "Token refreshed and stored");
        Ok(Some(athlete.access_token))
    }

    // ─── OAuth Callback Handling ─────────────────────────────────────────────

    /// Handle OAuth callback: exchange code for tokens and upsert the athlete row.
    pub async fn handle_oauth_callback(&self, code: &str) -> Result<AthleteRow, AppError> {
        let token_response = self.client.exchange_code(code).await?;

        let athlete = AthleteRow {
            athlete_id: token_response.athlete.id,
            athlete_name: token_response.athlete.display_name(),
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            expires_at: token_response.expires_at,
            updated_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        self.db.upsert_athlete(&athlete).await?;

        tracing::info!(
            athlete_id = athlete.athlete_id,
            athlete_name = %athlete.athlete_name,
            "OAuth callback handled, athlete tokens stored"
        );

        Ok(athlete)
    }

    // ─── API Wrappers ────────────────────────────────────────────────────────

    /// Fetch a detailed activity with a freshly validated token.
    ///
    /// `Ok(None)` when no usable token exists for the athlete.
    pub async fn get_activity(
        &self,
        athlete_id: u64,
        activity_id: u64,
    ) -> Result<Option<StravaActivity>, AppError> {
        let Some(access_token) = self.get_valid_access_token(athlete_id).await? else {
            return Ok(None);
        };
        self.client
            .get_activity(&access_token, activity_id)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_has_fixed_scope() {
        let client = StravaClient::new(&Config::test_default());
        let url = client.authorize_url("https://example.com/join-callback", "abc");

        assert!(url.starts_with("https://www.strava.com/oauth/authorize?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Fjoin-callback"));
        assert!(url.contains("scope=read%2Cactivity%3Aread_all"));
        assert!(url.contains("state=abc"));
    }

    #[test]
    fn display_name_joins_available_parts() {
        let athlete = StravaAthlete {
            id: 1,
            firstname: Some("Ada".to_string()),
            lastname: Some(" ".to_string()),
        };
        assert_eq!(athlete.display_name(), "Ada");

        let nameless = StravaAthlete {
            id: 1,
            firstname: None,
            lastname: None,
        };
        assert_eq!(nameless.display_name(), "");
    }

    #[test]
    fn minimal_activity_deserializes() {
        let activity: StravaActivity = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert_eq!(activity.id, 5);
        assert!(activity.segment_efforts.is_empty());
        assert_eq!(activity.distance, 0.0);
    }
}
