// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar API client for creating and listing events on the
//! user's primary calendar.

use crate::error::AppError;
use crate::time_utils::{format_utc_rfc3339, parse_rfc3339_utc};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Event to create on the user's calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
}

/// Event as returned by the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
}

/// Calendar operations performed with a user's access token.
///
/// Implementations report an expired or revoked access token as a
/// `CalendarApi` error for which `is_calendar_token_error()` holds.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Create an event and return the provider-assigned event id.
    async fn insert_event(
        &self,
        access_token: &str,
        event: &NewCalendarEvent,
    ) -> Result<String, AppError>;

    /// Non-deleted single-occurrence events in `[time_min, time_max)`,
    /// ordered by start time.
    async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError>;
}

/// reqwest-based Google Calendar v3 client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Client against a custom API root (tests).
    pub fn with_base_url(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/primary/events", self.base_url)
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 {
                return Err(AppError::CalendarApi(
                    AppError::CALENDAR_TOKEN_ERROR.to_string(),
                ));
            }

            return Err(AppError::CalendarApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::CalendarApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &NewCalendarEvent,
    ) -> Result<String, AppError> {
        let body = EventBody {
            summary: &event.title,
            description: &event.description,
            start: EventBodyTime::utc(event.start_time),
            end: EventBodyTime::utc(event.end_time),
            attendees: event
                .attendees
                .iter()
                .map(|email| EventBodyAttendee { email })
                .collect(),
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        let created: EventItem = self.check_response_json(response).await?;
        if created.id.is_empty() {
            return Err(AppError::CalendarApi(
                "created event has no id".to_string(),
            ));
        }
        Ok(created.id)
    }

    async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(access_token)
            .query(&[
                ("showDeleted", "false".to_string()),
                ("singleEvents", "true".to_string()),
                ("timeMin", format_utc_rfc3339(time_min)),
                ("timeMax", format_utc_rfc3339(time_max)),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        let list: EventList = self.check_response_json(response).await?;

        Ok(list.items.into_iter().map(CalendarEvent::from).collect())
    }
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventBodyTime,
    end: EventBodyTime,
    attendees: Vec<EventBodyAttendee<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBodyTime {
    date_time: String,
    time_zone: &'static str,
}

impl EventBodyTime {
    fn utc(at: DateTime<Utc>) -> Self {
        Self {
            date_time: format_utc_rfc3339(at),
            time_zone: "UTC",
        }
    }
}

#[derive(Serialize)]
struct EventBodyAttendee<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start: Option<EventItemTime>,
    #[serde(default)]
    end: Option<EventItemTime>,
    #[serde(default)]
    attendees: Vec<EventItemAttendee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventItemTime {
    #[serde(default)]
    date_time: Option<String>,
    /// All-day events carry only a date.
    #[serde(default)]
    date: Option<String>,
}

impl EventItemTime {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        if let Some(dt) = &self.date_time {
            return parse_rfc3339_utc(dt);
        }
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc())
    }
}

#[derive(Debug, Deserialize)]
struct EventItemAttendee {
    #[serde(default)]
    email: String,
}

impl From<EventItem> for CalendarEvent {
    fn from(item: EventItem) -> Self {
        let parse = |t: &Option<EventItemTime>| {
            t.as_ref()
                .and_then(EventItemTime::to_utc)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        };

        Self {
            start_time: parse(&item.start),
            end_time: parse(&item.end),
            id: item.id,
            title: item.summary.unwrap_or_default(),
            description: item.description.unwrap_or_default(),
            attendees: item
                .attendees
                .into_iter()
                .map(|a| a.email)
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}
