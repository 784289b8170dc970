// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meeting model: local mirror of a calendar event created through the API.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A meeting created through this service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meeting {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Google Calendar event ID
    pub event_id: String,
    /// Email of the user who created the meeting
    pub created_by: String,
    pub attendees: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a meeting; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeeting {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_id: String,
    pub created_by: String,
    pub attendees: Vec<String>,
}

/// Flatten attendees into the single text column used for storage.
pub fn join_attendees(attendees: &[String]) -> String {
    attendees.join(",")
}

/// Rebuild the attendee list from its stored form.
pub fn split_attendees(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(',').map(str::to_string).collect()
}
