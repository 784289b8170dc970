// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in routes and the public login page.

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::SESSION_COOKIE;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Name of the anti-forgery state cookie.
pub const STATE_COOKIE: &str = "oauthstate";

/// Maximum age of an OAuth state value, in seconds.
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page))
        .route("/auth/google/login", get(google_login))
        .route("/auth/google/callback", get(google_callback))
        .route("/logout", get(logout))
}

const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Sign in</title>
  <style>body { font-family: sans-serif; margin: 4rem auto; max-width: 32rem; }</style>
</head>
<body>
  <h1>Meeting Scheduler</h1>
  <p>Please log in to access your dashboard.</p>
  <p><a href="/auth/google/login">Sign in with Google</a></p>
</body>
</html>
"#;

async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// Start the OAuth flow: set the state cookie and redirect to Google.
async fn google_login(State(state): State<Arc<AppState>>, jar: CookieJar) -> Result<Response> {
    let oauth_state = sign_state(
        &Uuid::new_v4().to_string(),
        chrono::Utc::now().timestamp(),
        &state.config.csrf_secret,
    )?;

    let cookie = Cookie::build((STATE_COOKIE, oauth_state.clone()))
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(STATE_MAX_AGE_SECS));

    let auth_url = state.auth_service.authorize_url(&oauth_state);

    tracing::info!("Starting OAuth flow, redirecting to Google");

    Ok((jar.add(cookie), Redirect::to(&auth_url)).into_response())
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: check state, complete sign-in, set the session cookie.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let cookie_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());

    if let Err(e) = check_callback_state(
        cookie_state.as_deref(),
        params.state.as_deref(),
        &state.config.csrf_secret,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(error = %e, "Rejected OAuth callback state");
        return e.into_response();
    }

    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/"));

    match complete_sign_in(&state, &params).await {
        Ok(session) => {
            let cookie = session_cookie(&state.config, session);
            (jar.add(cookie), Redirect::to("/api/dashboard")).into_response()
        }
        Err(e) => (jar, e).into_response(),
    }
}

async fn complete_sign_in(state: &AppState, params: &CallbackParams) -> Result<String> {
    if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Err(AppError::Validation(format!("OAuth error: {}", error)));
    }

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Code not found".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");

    state.auth_service.handle_google_callback(code).await
}

fn session_cookie(config: &Config, session: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session))
        .http_only(true)
        .secure(config.is_production())
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Clear the session cookie and go back to the login page.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login"),
    )
}

// ─── OAuth state ─────────────────────────────────────────────

/// Build a state value `<nonce>.<unix_ts>.<hmac_hex>`.
pub fn sign_state(nonce: &str, issued_at: i64, secret: &[u8]) -> Result<String> {
    let payload = format!("{}.{}", nonce, issued_at);
    let signature = state_signature(&payload, secret)?;
    Ok(format!("{}.{}", payload, signature))
}

fn state_signature(payload: &str, secret: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Accept a callback only if the state cookie and query parameter match,
/// the signature is ours and the value is at most ten minutes old.
pub fn check_callback_state(
    cookie_state: Option<&str>,
    query_state: Option<&str>,
    secret: &[u8],
    now: i64,
) -> Result<()> {
    let cookie_state =
        cookie_state.ok_or_else(|| AppError::Validation("State cookie not found".to_string()))?;

    let query_state = query_state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Invalid state parameter".to_string()))?;

    if !bool::from(cookie_state.as_bytes().ct_eq(query_state.as_bytes())) {
        return Err(AppError::Validation("Invalid state parameter".to_string()));
    }

    verify_state(query_state, secret, now)
}

fn verify_state(value: &str, secret: &[u8], now: i64) -> Result<()> {
    let invalid = || AppError::Validation("Invalid state parameter".to_string());

    let (payload, signature) = value.rsplit_once('.').ok_or_else(invalid)?;
    let (_nonce, issued_at) = payload.rsplit_once('.').ok_or_else(invalid)?;

    let expected = state_signature(payload, secret)?;
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return Err(invalid());
    }

    let issued_at: i64 = issued_at.parse().map_err(|_| invalid())?;
    if issued_at > now || now - issued_at > STATE_MAX_AGE_SECS {
        return Err(AppError::Validation("State expired".to_string()));
    }

    Ok(())
}
