// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in: code exchange, identity verification, user upsert and
//! session token issuance.

use crate::db::UserRepository;
use crate::error::AppError;
use crate::middleware::auth::create_session_token;
use crate::models::{User, VerifiedClaims};
use crate::services::google_oauth::{OAuthProvider, TokenSet};
use crate::services::google_oidc::GoogleOidcVerifier;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    oauth: Arc<dyn OAuthProvider>,
    verifier: Arc<GoogleOidcVerifier>,
    jwt_secret: Vec<u8>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        oauth: Arc<dyn OAuthProvider>,
        verifier: Arc<GoogleOidcVerifier>,
        jwt_secret: Vec<u8>,
    ) -> Self {
        Self {
            users,
            oauth,
            verifier,
            jwt_secret,
        }
    }

    /// Consent screen URL for the given anti-forgery state.
    pub fn authorize_url(&self, state: &str) -> String {
        self.oauth.authorize_url(state)
    }

    /// Complete a Google sign-in and return a session token.
    ///
    /// The code exchange is not retried.
    pub async fn handle_google_callback(&self, code: &str) -> Result<String, AppError> {
        let tokens = self.oauth.exchange_code(code).await?;

        let id_token = tokens
            .id_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Exchange("token response has no id_token".to_string()))?;

        let claims = self.verifier.verify_id_token(id_token).await?;

        let user = self.upsert_user(&claims, &tokens).await?;

        let session = create_session_token(&user.email, &self.jwt_secret)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        tracing::info!(user_id = %user.id, email = %user.email, "Google sign-in completed");

        Ok(session)
    }

    /// Create the user on first sign-in, refresh profile and credentials after.
    async fn upsert_user(
        &self,
        claims: &VerifiedClaims,
        tokens: &TokenSet,
    ) -> Result<User, AppError> {
        let now = Utc::now();

        match self.users.find_by_google_id(&claims.subject).await? {
            Some(mut user) => {
                user.name = claims.name.clone();
                user.picture = claims.picture.clone();
                user.access_token = tokens.access_token.clone();
                user.expires_at = tokens.expires_at;
                if !tokens.refresh_token.is_empty() {
                    user.refresh_token = tokens.refresh_token.clone();
                }
                user.updated_at = now;

                self.users.update_user(&user).await?;
                tracing::debug!(user_id = %user.id, "Existing user updated");
                Ok(user)
            }
            None => {
                let user = User {
                    id: Uuid::new_v4(),
                    google_id: claims.subject.clone(),
                    email: claims.email.clone(),
                    name: claims.name.clone(),
                    picture: claims.picture.clone(),
                    access_token: tokens.access_token.clone(),
                    refresh_token: tokens.refresh_token.clone(),
                    expires_at: tokens.expires_at,
                    created_at: now,
                    updated_at: now,
                };

                self.users.create_user(&user).await?;
                tracing::info!(user_id = %user.id, email = %user.email, "New user created");
                Ok(user)
            }
        }
    }
}
