// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory repositories for tests and local runs without PostgreSQL.
//!
//! Same observable semantics as the PostgreSQL backend, including the
//! uniqueness of `google_id` and `email`.

use crate::db::{MeetingRepository, UserRepository};
use crate::error::AppError;
use crate::models::{Meeting, NewMeeting, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory `UserRepository`.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn conflicts(existing: &User, candidate: &User) -> bool {
    existing.id != candidate.id
        && (existing.google_id == candidate.google_id || existing.email == candidate.email)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) || users.values().any(|u| conflicts(u, user)) {
            return Err(AppError::Database(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.google_id == google_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| conflicts(u, user)) {
            return Err(AppError::Database(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }
        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(AppError::Database(format!("User {} does not exist", user.id))),
        }
    }
}

/// In-memory `MeetingRepository`.
#[derive(Default)]
pub struct InMemoryMeetingRepository {
    meetings: RwLock<Vec<Meeting>>,
}

impl InMemoryMeetingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored meeting, in insertion order.
    pub async fn all(&self) -> Vec<Meeting> {
        self.meetings.read().await.clone()
    }
}

#[async_trait]
impl MeetingRepository for InMemoryMeetingRepository {
    async fn create_meeting(&self, meeting: &NewMeeting) -> Result<Meeting, AppError> {
        let mut meetings = self.meetings.write().await;
        let stored = Meeting {
            id: meetings.len() as i64 + 1,
            title: meeting.title.clone(),
            description: meeting.description.clone(),
            start_time: meeting.start_time,
            end_time: meeting.end_time,
            event_id: meeting.event_id.clone(),
            created_by: meeting.created_by.clone(),
            attendees: meeting.attendees.clone(),
            created_at: Utc::now(),
        };
        meetings.push(stored.clone());
        Ok(stored)
    }

    async fn list_meetings_by_user(
        &self,
        email: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, AppError> {
        let meetings = self.meetings.read().await;
        let mut found: Vec<Meeting> = meetings
            .iter()
            .filter(|m| m.created_by == email && m.start_time >= start && m.end_time <= end)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.start_time);
        Ok(found)
    }

    async fn get_meeting_by_id(&self, id: i64) -> Result<Option<Meeting>, AppError> {
        let meetings = self.meetings.read().await;
        Ok(meetings.iter().find(|m| m.id == id).cloned())
    }
}
