//! All reads and writes of conversation state. No other module touches the
//! messages, message_attachments, or message_reads tables.

use std::collections::{HashMap, HashSet};

use sqlx::{FromRow, SqlitePool};

use crate::directory::EventRecord;
use crate::error::MessagingError;
use crate::guard::ParticipantRole;
use crate::types::{AttachmentRef, MessageSender, NewMessage, ReadOutcome, ReadReceipt, StoredMessage};

pub const MAX_CONTENT_LENGTH: usize = 4000;

#[derive(Debug, FromRow)]
struct MessageRow {
    id: i64,
    public_id: String,
    sender_id: i64,
    content: Option<String>,
    created_at: String,
}

#[derive(Debug, FromRow)]
struct AttachmentRow {
    message_id: i64,
    reference: String,
    file_name: String,
    media_type: String,
    size_bytes: i64,
}

#[derive(Debug, FromRow)]
struct ReceiptRow {
    message_id: i64,
    user_public_id: String,
    read_at: String,
}

#[derive(Debug, FromRow)]
struct SenderRow {
    id: i64,
    public_id: String,
    display_name: String,
}

/// Persist a message for an event. Writes the message row, the optional
/// attachment, and the sender's initial read receipt in one transaction, so a
/// stored message always lists its sender as having read it.
pub async fn create(
    pool: &SqlitePool,
    event: &EventRecord,
    sender_id: i64,
    new: NewMessage,
) -> Result<StoredMessage, MessagingError> {
    let content = match new.content.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(trimmed) => Some(trimmed.to_owned()),
    };

    if content.is_none() && new.attachment.is_none() {
        return Err(MessagingError::validation(
            "message requires text content or an attachment",
        ));
    }

    if let Some(text) = &content {
        if text.chars().count() > MAX_CONTENT_LENGTH {
            return Err(MessagingError::validation(format!(
                "message content exceeds {MAX_CONTENT_LENGTH} characters"
            )));
        }
    }

    let public_id = cuid2::create_id();
    let now = chrono::Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;

    let message_db_id = sqlx::query(
        r#"
        INSERT INTO messages (public_id, event_id, sender_id, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(event.id)
    .bind(sender_id)
    .bind(&content)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    if let Some(attachment) = &new.attachment {
        sqlx::query(
            r#"
            INSERT INTO message_attachments (message_id, reference, file_name, media_type, size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message_db_id)
        .bind(&attachment.reference)
        .bind(&attachment.name)
        .bind(&attachment.media_type)
        .bind(attachment.size_bytes)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("INSERT INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)")
        .bind(message_db_id)
        .bind(sender_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    load_message(pool, event, message_db_id).await
}

/// Full history of an event's conversation, oldest first.
pub async fn list_by_event(
    pool: &SqlitePool,
    event: &EventRecord,
) -> Result<Vec<StoredMessage>, MessagingError> {
    let rows = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT id, public_id, sender_id, content, created_at
        FROM messages
        WHERE event_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(event.id)
    .fetch_all(pool)
    .await?;

    let mut attachments = fetch_event_attachments(pool, event.id).await?;
    let mut receipts = fetch_event_receipts(pool, event.id).await?;
    let senders = fetch_event_senders(pool, event.id).await?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let sender = resolve_sender(&senders, event, row.sender_id)?;
        messages.push(StoredMessage {
            id: row.public_id,
            event_id: event.public_id.clone(),
            sender_id: sender.id.clone(),
            sender,
            content: row.content,
            attachment: attachments.remove(&row.id),
            created_at: row.created_at,
            read_by: receipts.remove(&row.id).unwrap_or_default(),
        });
    }

    Ok(messages)
}

/// Record read receipts for the given message ids on behalf of one reader.
///
/// Ids that are unknown or belong to a different event are skipped without
/// error; receipts that already exist are left untouched. The outcome names
/// only the messages whose receipt this call inserted, so concurrent calls
/// for the same reader report each message exactly once between them.
pub async fn mark_read(
    pool: &SqlitePool,
    event: &EventRecord,
    reader_id: i64,
    message_ids: &[String],
) -> Result<ReadOutcome, MessagingError> {
    let read_at = chrono::Utc::now().to_rfc3339();
    let mut newly_read = Vec::new();
    let mut seen = HashSet::new();

    for public_id in message_ids {
        if !seen.insert(public_id.as_str()) {
            continue;
        }

        let message_db_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM messages WHERE public_id = ? AND event_id = ?")
                .bind(public_id)
                .bind(event.id)
                .fetch_optional(pool)
                .await?;

        let Some(message_db_id) = message_db_id else {
            continue;
        };

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)",
        )
        .bind(message_db_id)
        .bind(reader_id)
        .bind(&read_at)
        .execute(pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            newly_read.push(public_id.clone());
        }
    }

    Ok(ReadOutcome {
        message_ids: newly_read,
        read_at,
    })
}

async fn load_message(
    pool: &SqlitePool,
    event: &EventRecord,
    message_db_id: i64,
) -> Result<StoredMessage, MessagingError> {
    let row = sqlx::query_as::<_, MessageRow>(
        r#"
        SELECT id, public_id, sender_id, content, created_at
        FROM messages
        WHERE id = ?
        "#,
    )
    .bind(message_db_id)
    .fetch_optional(pool)
    .await?
    .ok_or(MessagingError::NotFound)?;

    let attachment = sqlx::query_as::<_, AttachmentRow>(
        r#"
        SELECT message_id, reference, file_name, media_type, size_bytes
        FROM message_attachments
        WHERE message_id = ?
        "#,
    )
    .bind(message_db_id)
    .fetch_optional(pool)
    .await?
    .map(attachment_ref);

    let receipt_rows = sqlx::query_as::<_, ReceiptRow>(
        r#"
        SELECT r.message_id, u.public_id AS user_public_id, r.read_at
        FROM message_reads r
        JOIN users u ON u.id = r.user_id
        WHERE r.message_id = ?
        ORDER BY r.read_at ASC, r.id ASC
        "#,
    )
    .bind(message_db_id)
    .fetch_all(pool)
    .await?;

    let sender_row = sqlx::query_as::<_, SenderRow>(
        "SELECT id, public_id, display_name FROM users WHERE id = ?",
    )
    .bind(row.sender_id)
    .fetch_optional(pool)
    .await?
    .ok_or(MessagingError::NotFound)?;

    let sender = sender_doc(&sender_row, event);

    Ok(StoredMessage {
        id: row.public_id,
        event_id: event.public_id.clone(),
        sender_id: sender.id.clone(),
        sender,
        content: row.content,
        attachment,
        created_at: row.created_at,
        read_by: receipt_rows.into_iter().map(receipt).collect(),
    })
}

async fn fetch_event_attachments(
    pool: &SqlitePool,
    event_db_id: i64,
) -> Result<HashMap<i64, AttachmentRef>, MessagingError> {
    let rows = sqlx::query_as::<_, AttachmentRow>(
        r#"
        SELECT message_id, reference, file_name, media_type, size_bytes
        FROM message_attachments
        WHERE message_id IN (SELECT id FROM messages WHERE event_id = ?)
        "#,
    )
    .bind(event_db_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.message_id, attachment_ref(row)))
        .collect())
}

async fn fetch_event_receipts(
    pool: &SqlitePool,
    event_db_id: i64,
) -> Result<HashMap<i64, Vec<ReadReceipt>>, MessagingError> {
    let rows = sqlx::query_as::<_, ReceiptRow>(
        r#"
        SELECT r.message_id, u.public_id AS user_public_id, r.read_at
        FROM message_reads r
        JOIN users u ON u.id = r.user_id
        WHERE r.message_id IN (SELECT id FROM messages WHERE event_id = ?)
        ORDER BY r.read_at ASC, r.id ASC
        "#,
    )
    .bind(event_db_id)
    .fetch_all(pool)
    .await?;

    let mut by_message: HashMap<i64, Vec<ReadReceipt>> = HashMap::new();
    for row in rows {
        by_message
            .entry(row.message_id)
            .or_default()
            .push(receipt(row));
    }
    Ok(by_message)
}

async fn fetch_event_senders(
    pool: &SqlitePool,
    event_db_id: i64,
) -> Result<HashMap<i64, SenderRow>, MessagingError> {
    let rows = sqlx::query_as::<_, SenderRow>(
        r#"
        SELECT id, public_id, display_name
        FROM users
        WHERE id IN (SELECT DISTINCT sender_id FROM messages WHERE event_id = ?)
        "#,
    )
    .bind(event_db_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

fn resolve_sender(
    senders: &HashMap<i64, SenderRow>,
    event: &EventRecord,
    sender_db_id: i64,
) -> Result<MessageSender, MessagingError> {
    let row = senders.get(&sender_db_id).ok_or(MessagingError::NotFound)?;
    Ok(sender_doc(row, event))
}

fn sender_doc(row: &SenderRow, event: &EventRecord) -> MessageSender {
    let role = if event.requester_id == Some(row.id) {
        ParticipantRole::Requester
    } else if event.assignee_id == Some(row.id) {
        ParticipantRole::Assignee
    } else {
        ParticipantRole::Privileged
    };

    MessageSender {
        id: row.public_id.clone(),
        display_name: row.display_name.clone(),
        role,
    }
}

fn attachment_ref(row: AttachmentRow) -> AttachmentRef {
    AttachmentRef {
        reference: row.reference,
        name: row.file_name,
        media_type: row.media_type,
        size_bytes: row.size_bytes,
    }
}

fn receipt(row: ReceiptRow) -> ReadReceipt {
    ReadReceipt {
        user_id: row.user_public_id,
        read_at: row.read_at,
    }
}
