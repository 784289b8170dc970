// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meeting Scheduler API Server
//!
//! Signs users in with Google and creates and lists Google Calendar events
//! on their behalf.

use meeting_scheduler::{
    config::Config,
    db::{self, PgMeetingRepository, PgUserRepository},
    services::{
        AuthService, EventService, GoogleCalendarClient, GoogleOAuthClient, GoogleOidcVerifier,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, env = %config.env, "Starting Meeting Scheduler API");

    // Initialize PostgreSQL
    let pool = db::postgres::connect(&config.database_url).await?;
    db::postgres::init_schema(&pool).await?;

    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let meetings = Arc::new(PgMeetingRepository::new(pool));

    // Google clients
    let oauth = Arc::new(GoogleOAuthClient::new(&config)?);
    let calendar = Arc::new(GoogleCalendarClient::new()?);
    let verifier = Arc::new(GoogleOidcVerifier::new(&config)?);

    let auth_service = AuthService::new(
        users.clone(),
        oauth.clone(),
        verifier,
        config.jwt_secret.clone(),
    );
    let event_service = EventService::new(users, meetings, oauth, calendar);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        auth_service,
        event_service,
    });

    // Build router
    let app = meeting_scheduler::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("meeting_scheduler=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
