// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use meeting_scheduler::config::Config;
use meeting_scheduler::db::{InMemoryMeetingRepository, InMemoryUserRepository, UserRepository};
use meeting_scheduler::error::AppError;
use meeting_scheduler::middleware::auth::create_session_token;
use meeting_scheduler::models::User;
use meeting_scheduler::routes::create_router;
use meeting_scheduler::services::{
    AuthService, CalendarApi, CalendarEvent, EventService, GoogleOidcVerifier, NewCalendarEvent,
    OAuthProvider, TokenSet,
};
use meeting_scheduler::AppState;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_KID: &str = "test-kid";

const ID_TOKEN_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/id_token_test_key.pem");
const ID_TOKEN_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/id_token_test_key.pub.pem");

// ─── Fake OAuth provider ─────────────────────────────────────

/// OAuth provider answering from queued results.
///
/// An empty queue fails the call.
#[derive(Default)]
pub struct FakeOAuth {
    exchange_results: Mutex<VecDeque<Result<TokenSet, AppError>>>,
    refresh_results: Mutex<VecDeque<Result<TokenSet, AppError>>>,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub refresh_tokens_seen: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeOAuth {
    pub fn push_exchange(&self, result: Result<TokenSet, AppError>) {
        self.exchange_results.lock().unwrap().push_back(result);
    }

    pub fn push_refresh(&self, result: Result<TokenSet, AppError>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn exchange_count(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "https://accounts.example.test/o/oauth2/auth?state={}",
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenSet, AppError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Exchange("no scripted exchange".to_string())))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        self.refresh_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::TokenRefresh("no scripted refresh".to_string())))
    }
}

#[allow(dead_code)]
pub fn token_set(access: &str, refresh: &str, id_token: Option<String>) -> TokenSet {
    TokenSet {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        id_token,
    }
}

// ─── Fake calendar ───────────────────────────────────────────

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum CalendarCall {
    Insert {
        access_token: String,
        event: NewCalendarEvent,
    },
    List {
        access_token: String,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    },
}

/// Calendar answering from queued results.
///
/// An empty insert queue yields `evt-default`; an empty list queue yields
/// no events.
#[derive(Default)]
pub struct FakeCalendar {
    insert_results: Mutex<VecDeque<Result<String, AppError>>>,
    list_results: Mutex<VecDeque<Result<Vec<CalendarEvent>, AppError>>>,
    pub calls: Mutex<Vec<CalendarCall>>,
}

#[allow(dead_code)]
impl FakeCalendar {
    pub fn push_insert(&self, result: Result<String, AppError>) {
        self.insert_results.lock().unwrap().push_back(result);
    }

    pub fn push_list(&self, result: Result<Vec<CalendarEvent>, AppError>) {
        self.list_results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<CalendarCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tokens_used(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| match c {
                CalendarCall::Insert { access_token, .. } => access_token,
                CalendarCall::List { access_token, .. } => access_token,
            })
            .collect()
    }
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &NewCalendarEvent,
    ) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(CalendarCall::Insert {
            access_token: access_token.to_string(),
            event: event.clone(),
        });
        self.insert_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("evt-default".to_string()))
    }

    async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        self.calls.lock().unwrap().push(CalendarCall::List {
            access_token: access_token.to_string(),
            time_min,
            time_max,
        });
        self.list_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[allow(dead_code)]
pub fn token_error() -> AppError {
    AppError::CalendarApi(AppError::CALENDAR_TOKEN_ERROR.to_string())
}

// ─── Test application ────────────────────────────────────────

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub config: Config,
    pub users: Arc<InMemoryUserRepository>,
    pub meetings: Arc<InMemoryMeetingRepository>,
    pub oauth: Arc<FakeOAuth>,
    pub calendar: Arc<FakeCalendar>,
}

/// Build the full router over in-memory stores and fake Google services.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let users = Arc::new(InMemoryUserRepository::new());
    let meetings = Arc::new(InMemoryMeetingRepository::new());
    let oauth = Arc::new(FakeOAuth::default());
    let calendar = Arc::new(FakeCalendar::default());

    let verifier = Arc::new(
        GoogleOidcVerifier::new_with_static_key(
            &config,
            TEST_KID,
            DecodingKey::from_rsa_pem(ID_TOKEN_PUBLIC_KEY).unwrap(),
        )
        .unwrap(),
    );

    let auth_service = AuthService::new(
        users.clone(),
        oauth.clone(),
        verifier,
        config.jwt_secret.clone(),
    );
    let event_service = EventService::new(
        users.clone(),
        meetings.clone(),
        oauth.clone(),
        calendar.clone(),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        auth_service,
        event_service,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        config,
        users,
        meetings,
        oauth,
        calendar,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Session token for `email` signed with the app's key.
    pub fn session_token(&self, email: &str) -> String {
        create_session_token(email, &self.config.jwt_secret).unwrap()
    }

    /// Store a user with the given credentials.
    pub async fn seed_user(
        &self,
        email: &str,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            google_id: format!("google-{}", email),
            email: email.to_string(),
            name: "Test User".to_string(),
            picture: String::new(),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at,
            created_at: now,
            updated_at: now,
        };
        self.users.create_user(&user).await.unwrap();
        user
    }

    pub async fn stored_user(&self, email: &str) -> User {
        self.users.find_by_email(email).await.unwrap().unwrap()
    }
}

// ─── Tokens and bodies ───────────────────────────────────────

#[derive(Serialize)]
struct IdTokenClaims<'a> {
    iss: &'a str,
    aud: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    name: &'a str,
    picture: &'a str,
    iat: i64,
    exp: i64,
}

/// Google-style ID token signed with the test key.
#[allow(dead_code)]
pub fn id_token(config: &Config, subject: &str, email: &str, name: &str) -> String {
    id_token_with(
        config,
        "https://accounts.google.com",
        Some(subject),
        Some(email),
        name,
    )
}

/// ID token with a chosen issuer; `None` leaves the claim out entirely.
#[allow(dead_code)]
pub fn id_token_with(
    config: &Config,
    issuer: &str,
    subject: Option<&str>,
    email: Option<&str>,
    name: &str,
) -> String {
    let now = Utc::now().timestamp();
    let claims = IdTokenClaims {
        iss: issuer,
        aud: &config.google_client_id,
        sub: subject,
        email,
        name,
        picture: "https://example.test/p.png",
        iat: now,
        exp: now + 3600,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(ID_TOKEN_PRIVATE_KEY).unwrap(),
    )
    .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Values of every `Set-Cookie` header.
#[allow(dead_code)]
pub fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}
