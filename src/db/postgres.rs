// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgreSQL repositories backed by an `sqlx` connection pool.

use crate::db::{tables, MeetingRepository, UserRepository};
use crate::error::AppError;
use crate::models::meeting::{join_attendees, split_attendees};
use crate::models::{Meeting, NewMeeting, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

    tracing::info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Create the tables if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<(), AppError> {
    let statements = [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                google_id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL DEFAULT '',
                picture TEXT NOT NULL DEFAULT '',
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL DEFAULT '',
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            tables::USERS
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                start_time TIMESTAMPTZ NOT NULL,
                end_time TIMESTAMPTZ NOT NULL,
                event_id TEXT NOT NULL,
                attendees TEXT NOT NULL DEFAULT '',
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            tables::MEETINGS
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                meeting_id BIGINT NOT NULL REFERENCES {}(id),
                email TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            tables::ATTENDEES,
            tables::MEETINGS
        ),
    ];

    for statement in &statements {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database schema initialized");
    Ok(())
}

// ─── Users ───────────────────────────────────────────────────

/// `UserRepository` over PostgreSQL.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, google_id, email, name, picture, access_token, \
                            refresh_token, expires_at, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let query = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            tables::USERS,
            USER_COLUMNS
        );

        sqlx::query(&query)
            .bind(user.id)
            .bind(&user.google_id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.picture)
            .bind(&user.access_token)
            .bind(&user.refresh_token)
            .bind(user.expires_at)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!(user_id = %user.id, "User row inserted");
        Ok(())
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE google_id = $1",
            USER_COLUMNS,
            tables::USERS
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE email = $1",
            USER_COLUMNS,
            tables::USERS
        );

        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let query = format!(
            "UPDATE {} SET google_id = $2, email = $3, name = $4, picture = $5, \
             access_token = $6, refresh_token = $7, expires_at = $8, updated_at = $9 \
             WHERE id = $1",
            tables::USERS
        );

        let result = sqlx::query(&query)
            .bind(user.id)
            .bind(&user.google_id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.picture)
            .bind(&user.access_token)
            .bind(&user.refresh_token)
            .bind(user.expires_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Database(format!("User {} does not exist", user.id)));
        }
        Ok(())
    }
}

// ─── Meetings ────────────────────────────────────────────────

/// Row shape of the `meetings` table (attendees flattened).
#[derive(sqlx::FromRow)]
struct MeetingRow {
    id: i64,
    title: String,
    description: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    event_id: String,
    attendees: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<MeetingRow> for Meeting {
    fn from(row: MeetingRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            event_id: row.event_id,
            created_by: row.created_by,
            attendees: split_attendees(&row.attendees),
            created_at: row.created_at,
        }
    }
}

const MEETING_COLUMNS: &str =
    "id, title, description, start_time, end_time, event_id, attendees, created_by, created_at";

/// `MeetingRepository` over PostgreSQL.
#[derive(Clone)]
pub struct PgMeetingRepository {
    pool: PgPool,
}

impl PgMeetingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeetingRepository for PgMeetingRepository {
    async fn create_meeting(&self, meeting: &NewMeeting) -> Result<Meeting, AppError> {
        let query = format!(
            "INSERT INTO {} (title, description, start_time, end_time, event_id, attendees, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            tables::MEETINGS,
            MEETING_COLUMNS
        );

        // Dropping the transaction without commit rolls it back.
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MeetingRow>(&query)
            .bind(&meeting.title)
            .bind(&meeting.description)
            .bind(meeting.start_time)
            .bind(meeting.end_time)
            .bind(&meeting.event_id)
            .bind(join_attendees(&meeting.attendees))
            .bind(&meeting.created_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(meeting_id = row.id, event_id = %row.event_id, "Meeting row inserted");
        Ok(row.into())
    }

    async fn list_meetings_by_user(
        &self,
        email: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE created_by = $1 AND start_time >= $2 AND end_time <= $3 \
             ORDER BY start_time ASC",
            MEETING_COLUMNS,
            tables::MEETINGS
        );

        let rows = sqlx::query_as::<_, MeetingRow>(&query)
            .bind(email)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Meeting::from).collect())
    }

    async fn get_meeting_by_id(&self, id: i64) -> Result<Option<Meeting>, AppError> {
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            MEETING_COLUMNS,
            tables::MEETINGS
        );

        let row = sqlx::query_as::<_, MeetingRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Meeting::from))
    }
}
