// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session JWT issuance and the authentication gate for `/api/*`.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Session lifetime.
pub const SESSION_TTL_HOURS: i64 = 72;

/// Session JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionClaims {
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Authenticated user extracted from the session token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub email: String,
}

/// Middleware that requires a valid session token.
///
/// A non-empty `Authorization: Bearer` header wins over the `token` cookie.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let token = match bearer {
        Some(token) => token,
        None => jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthorized)?,
    };

    let email = validate_session_token(&token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::Unauthorized
    })?;

    request.extensions_mut().insert(AuthUser { email });

    Ok(next.run(request).await)
}

/// Create a session JWT for `email`, valid for 72 hours.
pub fn create_session_token(email: &str, signing_key: &[u8]) -> anyhow::Result<String> {
    let claims = SessionClaims {
        email: email.to_string(),
        exp: (Utc::now() + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Check signature and expiry (no leeway) and return the session email.
pub fn validate_session_token(
    token: &str,
    signing_key: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(signing_key),
        &validation,
    )?;

    if data.claims.email.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    Ok(data.claims.email)
}
