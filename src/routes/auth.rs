// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth onboarding routes.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::time_utils::now_unix;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Signed state older than this is rejected.
const STATE_MAX_AGE_SECS: i64 = 600;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/join", get(join))
        .route("/join-callback", get(join_callback))
}

/// Start OAuth flow - redirect to Strava authorization.
async fn join(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = sign_state(&state.config.oauth_state_key, now_unix())?;

    let auth_url = state
        .strava_service
        .client()
        .authorize_url(&state.config.strava_redirect_uri, &oauth_state);

    tracing::info!(
        client_id = %state.config.strava_client_id,
        redirect_uri = %state.config.strava_redirect_uri,
        "Starting OAuth flow, redirecting to Strava"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens and store the athlete.
async fn join_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return Err(AppError::BadRequest(format!("Authorization failed: {}", error)));
    }

    let state_valid = params
        .state
        .as_deref()
        .is_some_and(|s| verify_state(s, &state.config.oauth_state_key, now_unix()));
    if !state_valid {
        tracing::warn!("Invalid, expired or missing OAuth state");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    // Strava reports the granted scopes; without activity access nothing can sync.
    if let Some(scope) = params.scope.as_deref() {
        if !scope.split(',').any(|s| s.starts_with("activity:read")) {
            tracing::warn!(scope, "Athlete declined activity access");
            return Err(AppError::BadRequest(
                "Activity read access is required".to_string(),
            ));
        }
    }

    tracing::info!("Exchanging authorization code for tokens");

    let athlete = state.strava_service.handle_oauth_callback(&code).await?;

    let name = if athlete.athlete_name.is_empty() {
        format!("athlete {}", athlete.athlete_id)
    } else {
        athlete.athlete_name.clone()
    };

    Ok(Html(format!(
        "<!doctype html><html><head><title>Connected</title></head><body>\
         <h1>You're in, {}!</h1>\
         <p>New Strava activities will be added to the sheet automatically.</p>\
         </body></html>",
        escape_html(&name)
    )))
}

/// Build a signed state: base64("timestamp_hex|signature_hex").
fn sign_state(secret: &[u8], now: i64) -> Result<String> {
    let payload = format!("{:x}", now);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Verify the HMAC signature and age of an OAuth state parameter.
fn verify_state(state: &str, secret: &[u8], now: i64) -> bool {
    let Some(state_str) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let Some((timestamp_hex, signature_hex)) = state_str.split_once('|') else {
        return false;
    };
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(timestamp_hex.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    match i64::from_str_radix(timestamp_hex, 16) {
        Ok(issued) => (0..=STATE_MAX_AGE_SECS).contains(&(now - issued)),
        Err(_) => false,
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
