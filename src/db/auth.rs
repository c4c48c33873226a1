// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google service account authentication for the Sheets API.
//!
//! Signs an RS256 JWT assertion with the service account key and trades it
//! for an access token (RFC 7523 JWT bearer grant). The token is cached until
//! shortly before it expires.

use crate::error::AppError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Clone)]
struct CachedAccessToken {
    token: String,
    expires_at: Instant,
}

/// Access-token source for a service account.
pub struct ServiceAccountAuth {
    http: reqwest::Client,
    client_email: String,
    private_key_pem: String,
    token_uri: String,
    cached: RwLock<Option<CachedAccessToken>>,
    refresh_lock: Mutex<()>,
}

impl ServiceAccountAuth {
    pub fn new(
        http: reqwest::Client,
        client_email: String,
        private_key_pem: String,
        token_uri: String,
    ) -> Self {
        Self {
            http,
            client_email,
            private_key_pem,
            token_uri,
            cached: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return a valid bearer token, fetching a new one if needed.
    pub async fn access_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let assertion = self.sign_assertion(chrono::Utc::now().timestamp())?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Sheets(format!("Google token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(AppError::Sheets(format!(
                "Google token exchange failed with status {}",
                status
            )));
        }

        let token: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to parse Google token: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *self.cached.write().await = Some(CachedAccessToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        tracing::debug!(expires_in = token.expires_in, "Google access token refreshed");
        Ok(token.access_token)
    }

    async fn cached_token(&self) -> Option<String> {
        let cache = self.cached.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.token.clone())
    }

    fn sign_assertion(&self, now: i64) -> Result<String, AppError> {
        let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .map_err(|e| AppError::Sheets(format!("Invalid service account key: {}", e)))?;

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AppError::Sheets(format!("Failed to sign assertion: {}", e)))
    }
}
