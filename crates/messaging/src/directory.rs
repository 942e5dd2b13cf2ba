//! Read-only lookup of events.
//!
//! Event rows are written by the marketplace's booking service; this service
//! only reads them. Lookups always hit the database so that a reassignment is
//! visible to the very next authorization check.

use sqlx::{FromRow, SqlitePool};

use crate::error::MessagingError;

#[derive(Debug, Clone, FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub requester_id: Option<i64>,
    pub assignee_id: Option<i64>,
}

pub async fn find_event(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<Option<EventRecord>, MessagingError> {
    let event = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, public_id, title, requester_id, assignee_id
        FROM events
        WHERE public_id = ?
        "#,
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(event)
}

pub async fn require_event(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<EventRecord, MessagingError> {
    find_event(pool, public_id)
        .await?
        .ok_or(MessagingError::NotFound)
}

/// Insert an event row directly. Production rows arrive through the booking
/// service; this exists for seeding and tests.
pub async fn create_event(
    pool: &SqlitePool,
    title: &str,
    requester_id: Option<i64>,
    assignee_id: Option<i64>,
) -> Result<EventRecord, MessagingError> {
    let public_id = cuid2::create_id();
    let now = chrono::Utc::now().to_rfc3339();

    let id = sqlx::query(
        r#"
        INSERT INTO events (public_id, title, requester_id, assignee_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(title)
    .bind(requester_id)
    .bind(assignee_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(EventRecord {
        id,
        public_id,
        title: title.to_owned(),
        requester_id,
        assignee_id,
    })
}
