// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("OAuth exchange failed: {0}")]
    OAuthExchange(String),

    #[error("Sheets error: {0}")]
    Sheets(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub const STRAVA_TOKEN_ERROR: &'static str = "Token expired or invalid";
    pub const STRAVA_REFRESH_REJECTED: &'static str = "Refresh token rejected";
    pub const STRAVA_RATE_LIMIT: &'static str = "Rate limit exceeded";

    /// True when Strava rejected the access token (401).
    pub fn is_strava_token_error(&self) -> bool {
        matches!(self, AppError::StravaApi(msg) if msg == Self::STRAVA_TOKEN_ERROR)
    }

    /// True when the token endpoint refused the refresh grant (revoked or
    /// malformed refresh token). Outages and rate limits do not count.
    pub fn is_strava_refresh_rejected(&self) -> bool {
        matches!(self, AppError::StravaApi(msg) if msg == Self::STRAVA_REFRESH_REJECTED)
    }

    /// True when Strava reported the resource as missing.
    pub fn is_strava_not_found(&self) -> bool {
        matches!(self, AppError::StravaApi(msg) if msg.starts_with("HTTP 404"))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::StravaApi(msg) => {
                (StatusCode::BAD_GATEWAY, "strava_error", Some(msg.clone()))
            }
            AppError::OAuthExchange(msg) => {
                tracing::error!(error = %msg, "OAuth exchange error");
                (StatusCode::INTERNAL_SERVER_ERROR, "oauth_error", None)
            }
            AppError::Sheets(msg) => {
                tracing::error!(error = %msg, "Sheets error");
                (StatusCode::INTERNAL_SERVER_ERROR, "sheets_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
