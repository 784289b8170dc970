// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::events::{CreateEventInput, EventOutput};
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339_utc};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Extension, Json, Router,
};
use chrono::SubsecRound;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// RFC 5321 limit on the length of an address.
const MAX_EMAIL_LEN: usize = 254;

/// API routes (require authentication via session token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .route("/api/events", get(list_events).post(create_event))
}

// ─── Dashboard ───────────────────────────────────────────────

const DASHBOARD_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Dashboard</title>
  <style>body { font-family: sans-serif; margin: 2rem auto; max-width: 48rem; }</style>
</head>
<body>
  <h1>Welcome, {{email}}</h1>
  <p><a href="/logout">Log out</a></p>
  <h2>Create event</h2>
  <form id="createEventForm">
    <input name="title" placeholder="Title" required>
    <input name="description" placeholder="Description">
    <input name="start_time" type="datetime-local" required>
    <input name="end_time" type="datetime-local" required>
    <input name="attendees" placeholder="a@example.com, b@example.com">
    <button type="submit">Create</button>
  </form>
  <h2>Next 7 days</h2>
  <ul id="eventList"></ul>
  <script>
    const form = document.getElementById('createEventForm');
    const list = document.getElementById('eventList');

    async function fetchEvents() {
      const response = await fetch('/api/events');
      if (!response.ok) { alert('Failed to fetch events: ' + response.status); return; }
      const data = await response.json();
      list.innerHTML = '';
      data.events.forEach(ev => {
        const li = document.createElement('li');
        const start = new Date(ev.start_time).toLocaleString();
        const end = new Date(ev.end_time).toLocaleString();
        li.textContent = `${ev.title} - ${start} to ${end} - Attendees: ${ev.attendees.join(', ')}`;
        list.appendChild(li);
      });
    }

    form.addEventListener('submit', async (e) => {
      e.preventDefault();
      const fd = new FormData(form);
      const attendees = (fd.get('attendees') || '').split(',').map(s => s.trim()).filter(s => s);
      const response = await fetch('/api/events', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
          title: fd.get('title'),
          description: fd.get('description'),
          start_time: new Date(fd.get('start_time')).toISOString(),
          end_time: new Date(fd.get('end_time')).toISOString(),
          attendees,
        }),
      });
      if (!response.ok) {
        const err = await response.json().catch(() => ({}));
        alert('Failed to create event: ' + (err.details || err.error || response.status));
        return;
      }
      form.reset();
      await fetchEvents();
    });

    fetchEvents();
  </script>
</body>
</html>
"#;

async fn dashboard(Extension(user): Extension<AuthUser>) -> Html<String> {
    Html(DASHBOARD_TEMPLATE.replace("{{email}}", &escape_html(&user.email)))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ─── Events ──────────────────────────────────────────────────

/// Request body for creating an event. Missing fields read as empty.
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    /// `null` reads the same as an empty list.
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateEventResponse {
    pub message: String,
    pub event_id: String,
}

/// A calendar event, times in RFC3339 UTC.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventResponse {
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub attendees: Vec<String>,
    pub event_id: String,
    pub created_by: String,
}

impl From<EventOutput> for EventResponse {
    fn from(e: EventOutput) -> Self {
        Self {
            title: e.title,
            description: e.description,
            start_time: format_utc_rfc3339(e.start_time),
            end_time: format_utc_rfc3339(e.end_time),
            attendees: e.attendees,
            event_id: e.event_id,
            created_by: e.created_by,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventsResponse {
    pub events: Vec<EventResponse>,
}

/// Create an event on the signed-in user's calendar.
async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateEventResponse>)> {
    let Json(req) = payload.map_err(|e| {
        tracing::warn!(error = %e, "Failed to decode event request");
        AppError::Validation("Invalid request payload".to_string())
    })?;

    let input = validate_create_request(req, &user.email)?;
    let event_id = state.event_service.create_event(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            message: "Event created successfully".to_string(),
            event_id,
        }),
    ))
}

/// Upcoming events from the signed-in user's calendar.
async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<EventsResponse>> {
    let events = state.event_service.list_events(&user.email).await?;

    Ok(Json(EventsResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
    }))
}

/// Check times and attendees, in that order, and build the service input.
///
/// Times are cut to whole seconds, the precision the calendar receives.
fn validate_create_request(req: CreateEventRequest, creator: &str) -> Result<CreateEventInput> {
    let start_time = parse_rfc3339_utc(&req.start_time)
        .map(|t| t.trunc_subsecs(0))
        .ok_or_else(|| AppError::Validation("Invalid start time format".to_string()))?;
    let end_time = parse_rfc3339_utc(&req.end_time)
        .map(|t| t.trunc_subsecs(0))
        .ok_or_else(|| AppError::Validation("Invalid end time format".to_string()))?;

    if start_time >= end_time {
        return Err(AppError::Validation(
            "start time must be before end time".to_string(),
        ));
    }

    let attendees = req.attendees.unwrap_or_default();
    if let Some(bad) = attendees.iter().find(|e| !is_valid_email(e)) {
        return Err(AppError::Validation(format!(
            "Invalid attendee email: {}",
            bad
        )));
    }

    Ok(CreateEventInput {
        creator_email: creator.to_string(),
        title: req.title,
        description: req.description,
        start_time,
        end_time,
        attendees,
    })
}

/// Loose shape check only: an `@`, a `.`, and a sane length.
fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.') && email.len() <= MAX_EMAIL_LEN
}
