// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meeting Scheduler: Google sign-in plus a Google Calendar proxy.
//!
//! This crate provides the backend that signs users in with Google, keeps
//! their OAuth credentials, and creates and lists calendar events for them.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{AuthService, EventService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub auth_service: AuthService,
    pub event_service: EventService,
}
