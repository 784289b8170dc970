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
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("ID token verification failed: {0}")]
    Verification(String),

    #[error("ID token claims invalid: {0}")]
    Claims(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Calendar API error: {0}")]
    CalendarApi(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker used when the calendar API answers 401.
    pub const CALENDAR_TOKEN_ERROR: &'static str = "Invalid Credentials (HTTP 401)";

    /// Substrings that identify an expired or revoked access token in
    /// provider error text. Heuristic: HTTP 401 is mapped to
    /// `CALENDAR_TOKEN_ERROR` first, this list is the fallback.
    const TOKEN_ERROR_PATTERNS: &'static [&'static str] =
        &["invalid_grant", "expired", "invalid credentials"];

    /// Whether a calendar API failure should trigger a credential refresh.
    pub fn is_calendar_token_error(&self) -> bool {
        match self {
            AppError::CalendarApi(msg) => {
                let msg = msg.to_ascii_lowercase();
                Self::TOKEN_ERROR_PATTERNS
                    .iter()
                    .any(|pattern| msg.contains(pattern))
            }
            _ => false,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
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
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Exchange(_) | AppError::Verification(_) | AppError::Claims(_) => {
                tracing::error!(error = %self, "Authentication failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "authentication_failed",
                    None,
                )
            }
            AppError::UserNotFound(email) => {
                tracing::error!(email = %email, "user not found for verified identity");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::CalendarApi(msg) => {
                tracing::error!(error = %msg, "Calendar API error");
                (StatusCode::INTERNAL_SERVER_ERROR, "calendar_error", None)
            }
            AppError::TokenRefresh(msg) => {
                tracing::error!(error = %msg, "Token refresh failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "calendar_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
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
