// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and shared read-only through `AppState`.

use std::env;

/// OAuth scopes requested at the Google consent screen.
pub const OAUTH_SCOPES: &[&str] = &[
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Server port
    pub port: u16,
    /// Deployment environment name (`production` enables Secure cookies)
    pub env: String,
    /// Upper bound on a single request, including outbound calls
    pub request_timeout_secs: u64,

    // --- Google OAuth ---
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_url: String,

    // --- Secrets ---
    /// HMAC key for session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// HMAC key for the OAuth anti-forgery state value
    pub csrf_secret: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/meetings_test".to_string(),
            port: 8080,
            env: "development".to_string(),
            request_timeout_secs: 30,
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_client_secret: "test_secret".to_string(),
            google_redirect_url: "http://localhost:8080/auth/google/callback".to_string(),
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            csrf_secret: b"test_csrf_key_32_bytes_minimum!".to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first when present. Every required variable
    /// must be set and non-empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DB_URL")?,
            port: optional_number("PORT", 8080)?,
            env: env::var("ENV").unwrap_or_default(),
            request_timeout_secs: optional_number("REQUEST_TIMEOUT_SECS", 30)?,
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            google_redirect_url: required("GOOGLE_REDIRECT_URL")?,
            jwt_secret: required("JWT_SECRET")?.into_bytes(),
            csrf_secret: required("CSRF_SECRET")?.into_bytes(),
        })
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Unset or blank means `default`; anything else must parse.
fn optional_number<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name).map(|v| v.trim().to_string()) {
        Ok(v) if !v.is_empty() => v.parse().map_err(|_| ConfigError::Invalid(name)),
        _ => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases live in one test: env vars are process-global and tests run
    // on parallel threads.
    #[test]
    fn test_config_from_env() {
        env::set_var("DB_URL", "postgres://localhost/meetings");
        env::set_var("GOOGLE_CLIENT_ID", "client-id");
        env::set_var("GOOGLE_CLIENT_SECRET", "client-secret");
        env::set_var("GOOGLE_REDIRECT_URL", "http://localhost:8080/auth/google/callback");
        env::set_var("JWT_SECRET", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("CSRF_SECRET", "test_csrf_key");
        env::set_var("ENV", "production");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_client_id, "client-id");
        assert_eq!(config.google_client_secret, "client-secret");
        assert_eq!(config.jwt_secret, b"test_jwt_key_32_bytes_minimum!!".to_vec());
        assert_eq!(config.port, 8080);
        assert!(config.is_production());

        env::set_var("CSRF_SECRET", "  ");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CSRF_SECRET")));
        env::set_var("CSRF_SECRET", "test_csrf_key");

        env::set_var("PORT", "eighty");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORT")));

        env::set_var("PORT", "9090");
        env::set_var("REQUEST_TIMEOUT_SECS", "-5");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("REQUEST_TIMEOUT_SECS")));

        env::set_var("REQUEST_TIMEOUT_SECS", "45");
        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.port, 9090);
        assert_eq!(config.request_timeout_secs, 45);
        env::remove_var("PORT");
        env::remove_var("REQUEST_TIMEOUT_SECS");
    }

    #[test]
    fn test_default_is_not_production() {
        assert!(!Config::default().is_production());
    }
}
