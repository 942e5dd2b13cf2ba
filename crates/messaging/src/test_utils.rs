//! Shared helpers for this crate's tests.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::directory::{self, EventRecord};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../database/migrations");

/// Creates a migrated test database backed by a temp directory.
/// Returns the pool and the TempDir guard; keep the guard alive for the
/// duration of the test.
pub async fn create_test_db() -> (SqlitePool, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Memory)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("failed to connect to test database");

    MIGRATOR.run(&pool).await.expect("failed to run migrations");

    (pool, temp_dir)
}

/// Inserts a user row with a fixed row id so tests can reference users
/// without threading generated ids around.
pub async fn create_test_user(
    pool: &SqlitePool,
    id: i64,
    public_id: &str,
    email: &str,
    is_admin: bool,
) {
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO users (id, public_id, email, display_name, password_hash, is_admin, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'not-a-real-hash', ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(public_id)
    .bind(email)
    .bind(public_id)
    .bind(is_admin)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .expect("failed to insert test user");
}

pub async fn create_test_event(
    pool: &SqlitePool,
    requester_id: Option<i64>,
    assignee_id: Option<i64>,
) -> EventRecord {
    directory::create_event(pool, "Test Event", requester_id, assignee_id)
        .await
        .expect("failed to insert test event")
}

/// Inserts a message with an explicit creation timestamp, mirroring what
/// `store::create` writes, including the sender's initial read receipt.
pub async fn create_test_message(
    pool: &SqlitePool,
    event_db_id: i64,
    sender_id: i64,
    content: &str,
    created_at: &str,
) -> String {
    let public_id = cuid2::create_id();
    let message_db_id = sqlx::query(
        r#"
        INSERT INTO messages (public_id, event_id, sender_id, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(event_db_id)
    .bind(sender_id)
    .bind(content)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("failed to insert test message")
    .last_insert_rowid();

    sqlx::query(
        "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)",
    )
    .bind(message_db_id)
    .bind(sender_id)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("failed to insert sender receipt");

    public_id
}

pub mod fixtures {
    pub const TEST_REQUESTER_ID: i64 = 1;
    pub const TEST_ASSIGNEE_ID: i64 = 2;
    pub const TEST_ADMIN_ID: i64 = 3;
    pub const TEST_OUTSIDER_ID: i64 = 4;
}
