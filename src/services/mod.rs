// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod calendar;
pub mod events;
pub mod google_oauth;
pub mod google_oidc;

pub use auth::AuthService;
pub use calendar::{CalendarApi, CalendarEvent, GoogleCalendarClient, NewCalendarEvent};
pub use events::{CreateEventInput, EventOutput, EventService};
pub use google_oauth::{GoogleOAuthClient, OAuthProvider, TokenSet};
pub use google_oidc::GoogleOidcVerifier;
