// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event orchestration on behalf of signed-in users.
//!
//! Every calendar call goes through [`EventService::call_with_refresh`]:
//! - an access token already past its expiry is refreshed before the call
//! - a call rejected for an expired token is retried once after a refresh
//! - at most one refresh happens per operation
//!
//! Refreshed credentials are written back to the user row. There is no
//! per-user lock; concurrent refreshes are tolerated and the last write
//! wins.

use crate::db::{MeetingRepository, UserRepository};
use crate::error::AppError;
use crate::models::{NewMeeting, User};
use crate::services::calendar::{CalendarApi, CalendarEvent, NewCalendarEvent};
use crate::services::google_oauth::OAuthProvider;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use std::sync::Arc;

/// Length of the listing window starting now.
const LIST_WINDOW_DAYS: i64 = 7;

/// Validated request to create an event.
#[derive(Debug, Clone)]
pub struct CreateEventInput {
    pub creator_email: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
}

/// Event as presented to API clients.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutput {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
    pub event_id: String,
    pub created_by: String,
}

pub struct EventService {
    users: Arc<dyn UserRepository>,
    meetings: Arc<dyn MeetingRepository>,
    oauth: Arc<dyn OAuthProvider>,
    calendar: Arc<dyn CalendarApi>,
}

impl EventService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        meetings: Arc<dyn MeetingRepository>,
        oauth: Arc<dyn OAuthProvider>,
        calendar: Arc<dyn CalendarApi>,
    ) -> Self {
        Self {
            users,
            meetings,
            oauth,
            calendar,
        }
    }

    /// Create the event on the creator's calendar, then record it locally.
    ///
    /// The local row is written only after the calendar accepted the event.
    /// If that write fails the error is returned and the calendar event is
    /// left in place.
    pub async fn create_event(&self, input: CreateEventInput) -> Result<String, AppError> {
        let user = self.load_user(&input.creator_email).await?;

        let event = NewCalendarEvent {
            title: input.title,
            description: input.description,
            start_time: input.start_time,
            end_time: input.end_time,
            attendees: input.attendees,
        };

        let calendar = self.calendar.as_ref();
        let event_ref = &event;
        let event_id = self
            .call_with_refresh(user, |token| async move {
                calendar.insert_event(&token, event_ref).await
            })
            .await?;

        let meeting = self
            .meetings
            .create_meeting(&NewMeeting {
                title: event.title,
                description: event.description,
                start_time: event.start_time,
                end_time: event.end_time,
                event_id: event_id.clone(),
                created_by: input.creator_email.clone(),
                attendees: event.attendees,
            })
            .await?;

        tracing::info!(
            email = %input.creator_email,
            event_id = %event_id,
            meeting_id = meeting.id,
            "Event created"
        );

        Ok(event_id)
    }

    /// Events on the user's calendar in the next seven days, earliest first.
    pub async fn list_events(&self, email: &str) -> Result<Vec<EventOutput>, AppError> {
        let user = self.load_user(email).await?;

        let time_min = Utc::now();
        let time_max = time_min + Duration::days(LIST_WINDOW_DAYS);

        let calendar = self.calendar.as_ref();
        let mut events = self
            .call_with_refresh(user, |token| async move {
                calendar.list_events(&token, time_min, time_max).await
            })
            .await?;

        events.sort_by_key(|e| e.start_time);

        tracing::debug!(email = %email, count = events.len(), "Listed events");

        Ok(events
            .into_iter()
            .map(|e| into_output(e, email))
            .collect())
    }

    async fn load_user(&self, email: &str) -> Result<User, AppError> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::UserNotFound(email.to_string()))
    }

    /// Run `call` with the user's access token, refreshing at most once.
    async fn call_with_refresh<T, F, Fut>(&self, mut user: User, call: F) -> Result<T, AppError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if user.access_token_expired(Utc::now()) {
            tracing::info!(email = %user.email, "Access token expired, refreshing");
            self.refresh_credentials(&mut user).await?;
            return call(user.access_token.clone()).await;
        }

        match call(user.access_token.clone()).await {
            Err(err) if err.is_calendar_token_error() => {
                tracing::info!(
                    email = %user.email,
                    error = %err,
                    "Calendar rejected access token, refreshing"
                );
                self.refresh_credentials(&mut user).await?;
                call(user.access_token.clone()).await
            }
            other => other,
        }
    }

    /// Refresh the user's access token and persist the new credentials.
    ///
    /// The stored refresh token is kept when the provider does not issue a
    /// new one. On failure nothing is written.
    async fn refresh_credentials(&self, user: &mut User) -> Result<(), AppError> {
        let tokens = self.oauth.refresh_token(&user.refresh_token).await?;

        user.access_token = tokens.access_token;
        if !tokens.refresh_token.is_empty() {
            user.refresh_token = tokens.refresh_token;
        }
        user.expires_at = tokens.expires_at;
        user.updated_at = Utc::now();

        self.users.update_user(user).await?;

        tracing::info!(email = %user.email, "Access token refreshed");
        Ok(())
    }
}

fn into_output(event: CalendarEvent, requester: &str) -> EventOutput {
    EventOutput {
        title: event.title,
        description: event.description,
        start_time: event.start_time,
        end_time: event.end_time,
        attendees: event.attendees,
        event_id: event.id,
        created_by: requester.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryMeetingRepository, InMemoryUserRepository};
    use crate::services::google_oauth::TokenSet;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct ScriptedOAuth {
        refreshes: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl OAuthProvider for ScriptedOAuth {
        fn authorize_url(&self, state: &str) -> String {
            format!("https://example.test/auth?state={}", state)
        }

        async fn exchange_code(&self, _code: &str) -> Result<TokenSet, AppError> {
            Err(AppError::Exchange("unused".to_string()))
        }

        async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenSet, AppError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::TokenRefresh("invalid_grant".to_string()));
            }
            Ok(TokenSet {
                access_token: "fresh".to_string(),
                refresh_token: String::new(),
                expires_at: Utc::now() + Duration::hours(1),
                id_token: None,
            })
        }
    }

    /// Accepts only the "fresh" access token.
    #[derive(Default)]
    struct StrictCalendar {
        tokens_seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CalendarApi for StrictCalendar {
        async fn insert_event(
            &self,
            access_token: &str,
            _event: &NewCalendarEvent,
        ) -> Result<String, AppError> {
            self.tokens_seen.lock().unwrap().push(access_token.to_string());
            if access_token == "fresh" {
                Ok("evt-1".to_string())
            } else {
                Err(AppError::CalendarApi(
                    AppError::CALENDAR_TOKEN_ERROR.to_string(),
                ))
            }
        }

        async fn list_events(
            &self,
            access_token: &str,
            time_min: DateTime<Utc>,
            _time_max: DateTime<Utc>,
        ) -> Result<Vec<CalendarEvent>, AppError> {
            self.tokens_seen.lock().unwrap().push(access_token.to_string());
            let at = |hours| CalendarEvent {
                id: format!("e{}", hours),
                title: format!("t{}", hours),
                description: String::new(),
                start_time: time_min + Duration::hours(hours),
                end_time: time_min + Duration::hours(hours + 1),
                attendees: vec![],
            };
            Ok(vec![at(5), at(2)])
        }
    }

    async fn seeded_users(expires_in: Duration) -> Arc<InMemoryUserRepository> {
        let users = Arc::new(InMemoryUserRepository::new());
        let now = Utc::now();
        users
            .create_user(&User {
                id: Uuid::new_v4(),
                google_id: "g1".to_string(),
                email: "a@b.com".to_string(),
                name: "A".to_string(),
                picture: String::new(),
                access_token: "stale".to_string(),
                refresh_token: "r1".to_string(),
                expires_at: now + expires_in,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        users
    }

    fn input() -> CreateEventInput {
        let start = Utc::now() + Duration::days(1);
        CreateEventInput {
            creator_email: "a@b.com".to_string(),
            title: "Sync".to_string(),
            description: String::new(),
            start_time: start,
            end_time: start + Duration::hours(1),
            attendees: vec!["c@d.org".to_string()],
        }
    }

    #[tokio::test]
    async fn rejected_token_is_refreshed_once_and_retried() {
        let users = seeded_users(Duration::hours(1)).await;
        let meetings = Arc::new(InMemoryMeetingRepository::new());
        let oauth = Arc::new(ScriptedOAuth {
            refreshes: AtomicUsize::new(0),
            fail: false,
        });
        let calendar = Arc::new(StrictCalendar::default());
        let service = EventService::new(
            users.clone(),
            meetings.clone(),
            oauth.clone(),
            calendar.clone(),
        );

        let id = service.create_event(input()).await.unwrap();

        assert_eq!(id, "evt-1");
        assert_eq!(oauth.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(*calendar.tokens_seen.lock().unwrap(), vec!["stale", "fresh"]);

        let stored = users.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token, "r1");
        assert_eq!(meetings.all().await.len(), 1);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_the_call() {
        let users = seeded_users(Duration::hours(-1)).await;
        let oauth = Arc::new(ScriptedOAuth {
            refreshes: AtomicUsize::new(0),
            fail: false,
        });
        let calendar = Arc::new(StrictCalendar::default());
        let service = EventService::new(
            users,
            Arc::new(InMemoryMeetingRepository::new()),
            oauth.clone(),
            calendar.clone(),
        );

        let events = service.list_events("a@b.com").await.unwrap();

        assert_eq!(oauth.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(*calendar.tokens_seen.lock().unwrap(), vec!["fresh"]);
        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e5"]);
        assert!(events.iter().all(|e| e.created_by == "a@b.com"));
    }

    #[tokio::test]
    async fn failed_refresh_leaves_credentials_untouched() {
        let users = seeded_users(Duration::hours(1)).await;
        let meetings = Arc::new(InMemoryMeetingRepository::new());
        let service = EventService::new(
            users.clone(),
            meetings.clone(),
            Arc::new(ScriptedOAuth {
                refreshes: AtomicUsize::new(0),
                fail: true,
            }),
            Arc::new(StrictCalendar::default()),
        );

        let err = service.create_event(input()).await.unwrap_err();

        assert!(matches!(err, AppError::TokenRefresh(_)));
        let stored = users.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(stored.access_token, "stale");
        assert_eq!(stored.refresh_token, "r1");
        assert!(meetings.all().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_user_not_found() {
        let service = EventService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryMeetingRepository::new()),
            Arc::new(ScriptedOAuth {
                refreshes: AtomicUsize::new(0),
                fail: false,
            }),
            Arc::new(StrictCalendar::default()),
        );

        let err = service.list_events("nobody@b.com").await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound(_)));
    }
}
