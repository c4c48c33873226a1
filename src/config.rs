// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file in the working directory
//! is honored for local development.

use std::env;

pub const DEFAULT_STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_STRAVA_OAUTH_BASE: &str = "https://www.strava.com/oauth";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope requested on `/join`.
pub const STRAVA_SCOPE: &str = "read,activity:read_all";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Strava ---
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Callback URL registered with Strava (points at `/join-callback`)
    pub strava_redirect_uri: String,
    /// Shared secret echoed by Strava during webhook subscription
    pub webhook_verify_token: String,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    pub strava_api_base: String,
    pub strava_oauth_base: String,

    // --- Google Sheets ---
    pub google_service_account_email: String,
    /// PEM-encoded RSA private key of the service account
    pub google_private_key: String,
    pub google_token_uri: String,
    pub sheets_api_base: String,
    pub spreadsheet_id: String,

    // --- Server / queue ---
    pub port: u16,
    pub queue_capacity: usize,
    pub queue_max_attempts: u32,
    pub queue_retry_backoff_ms: u64,
    pub dead_letter_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let strava_client_secret = required_secret("STRAVA_CLIENT_SECRET")?;
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| strava_client_secret.clone())
            .into_bytes();

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret,
            strava_redirect_uri: required("STRAVA_REDIRECT_URI")?,
            webhook_verify_token: required_secret("WEBHOOK_VERIFY_TOKEN")?,
            oauth_state_key,
            strava_api_base: optional("STRAVA_API_BASE", DEFAULT_STRAVA_API_BASE),
            strava_oauth_base: optional("STRAVA_OAUTH_BASE", DEFAULT_STRAVA_OAUTH_BASE),

            google_service_account_email: required("GOOGLE_SERVICE_ACCOUNT_EMAIL")?,
            google_private_key: unescape_private_key(&required("GOOGLE_PRIVATE_KEY")?),
            google_token_uri: optional("GOOGLE_TOKEN_URI", DEFAULT_GOOGLE_TOKEN_URI),
            sheets_api_base: optional("SHEETS_API_BASE", DEFAULT_SHEETS_API_BASE),
            spreadsheet_id: required("SPREADSHEET_ID")?,

            port: parsed("PORT", 8080)?,
            queue_capacity: parsed("QUEUE_CAPACITY", 1000)?,
            queue_max_attempts: parsed("QUEUE_MAX_ATTEMPTS", 3)?,
            queue_retry_backoff_ms: parsed("QUEUE_RETRY_BACKOFF_MS", 500)?,
            dead_letter_capacity: parsed("DEAD_LETTER_CAPACITY", 100)?,
        })
    }

    /// Deterministic config for tests. Queue retries have no backoff.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_redirect_uri: "http://localhost:8080/join-callback".to_string(),
            webhook_verify_token: "test_verify_token".to_string(),
            oauth_state_key: b"test_state_key".to_vec(),
            strava_api_base: DEFAULT_STRAVA_API_BASE.to_string(),
            strava_oauth_base: DEFAULT_STRAVA_OAUTH_BASE.to_string(),
            google_service_account_email: "sheets@test-project.iam.gserviceaccount.com"
                .to_string(),
            google_private_key: String::new(),
            google_token_uri: DEFAULT_GOOGLE_TOKEN_URI.to_string(),
            sheets_api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            spreadsheet_id: "test-spreadsheet".to_string(),
            port: 8080,
            queue_capacity: 100,
            queue_max_attempts: 2,
            queue_retry_backoff_ms: 0,
            dead_letter_capacity: 10,
        }
    }

    /// Point the Strava client at a different host (mock servers in tests).
    pub fn with_strava_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.strava_api_base = format!("{}/api/v3", base);
        self.strava_oauth_base = format!("{}/oauth", base);
        self
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn required_secret(name: &'static str) -> Result<String, ConfigError> {
    required(name).map(|v| v.trim().to_string())
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Private keys pasted into env files usually carry literal `\n` sequences.
fn unescape_private_key(raw: &str) -> String {
    raw.trim().trim_matches('"').replace("\\n", "\n")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
