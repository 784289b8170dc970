// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model: identity plus cached Google OAuth credentials.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A user authenticated through Google.
///
/// OAuth credentials are kept on the same row and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    /// Google subject (`sub` claim), unique
    pub google_id: String,
    /// Verified email, unique
    pub email: String,
    pub name: String,
    pub picture: String,
    #[serde(skip)]
    pub access_token: String,
    /// May be empty if Google never issued one
    #[serde(skip)]
    pub refresh_token: String,
    #[serde(skip)]
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the stored access token has passed its expiry.
    pub fn access_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Claims extracted from a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: String,
}
