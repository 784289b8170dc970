// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 client.
//!
//! Handles:
//! - Consent screen URL construction
//! - Authorization code exchange
//! - Access token refresh

use crate::config::{Config, OAUTH_SCOPES};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Tokens returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    /// Empty when the provider did not issue a new one.
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    /// Raw OpenID Connect ID token (present on code exchange).
    pub id_token: Option<String>,
}

/// The OAuth operations the service needs from the identity provider.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL of the consent screen carrying the given anti-forgery state.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for tokens. Fails with `Exchange`.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AppError>;

    /// Obtain a fresh access token. Fails with `TokenRefresh`.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError>;
}

/// Google token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    id_token: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self, now: DateTime<Utc>) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            expires_at: now + Duration::seconds(self.expires_in.unwrap_or(3600)),
            id_token: self.id_token,
        }
    }
}

/// reqwest-based Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleOAuthClient {
    /// Create a client for the production Google endpoints.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_endpoints(config, AUTH_URL, TOKEN_URL)
    }

    /// Create a client against custom endpoints (tests).
    pub fn with_endpoints(
        config: &Config,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_url: config.google_redirect_url.clone(),
        })
    }

    async fn post_token_form(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, (Option<reqwest::StatusCode>, String)> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| (None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err((Some(status), body));
        }

        response
            .json()
            .await
            .map_err(|e| (Some(status), format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&OAUTH_SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AppError> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self.post_token_form(&form).await.map_err(|(status, body)| {
            tracing::error!(status = ?status, body = %body, "Google token exchange failed");
            AppError::Exchange(match status {
                Some(status) => format!("status {}: {}", status, body),
                None => body,
            })
        })?;

        Ok(response.into_token_set(Utc::now()))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        if refresh_token.is_empty() {
            return Err(AppError::TokenRefresh(
                "no refresh token stored for user".to_string(),
            ));
        }

        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_form(&form).await.map_err(|(status, body)| {
            AppError::TokenRefresh(match status {
                Some(status) => format!("status {}: {}", status, body),
                None => body,
            })
        })?;

        Ok(response.into_token_set(Utc::now()))
    }
}
