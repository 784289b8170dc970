// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: repository traits plus PostgreSQL and in-memory backends.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryMeetingRepository, InMemoryUserRepository};
pub use postgres::{PgMeetingRepository, PgUserRepository};

use crate::error::AppError;
use crate::models::{Meeting, NewMeeting, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const MEETINGS: &str = "meetings";
    /// Present in the schema, not written by the service.
    pub const ATTENDEES: &str = "attendees";
}

/// Storage for users and their OAuth credentials.
///
/// Lookups return `Ok(None)` when no row matches.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Overwrite every mutable column of an existing user (last write wins).
    async fn update_user(&self, user: &User) -> Result<(), AppError>;
}

/// Storage for meetings mirrored from created calendar events.
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    async fn create_meeting(&self, meeting: &NewMeeting) -> Result<Meeting, AppError>;

    /// Meetings created by `email` that fall entirely within `[start, end]`.
    async fn list_meetings_by_user(
        &self,
        email: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, AppError>;

    async fn get_meeting_by_id(&self, id: i64) -> Result<Option<Meeting>, AppError>;
}
