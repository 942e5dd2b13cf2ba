//! Per-event authorization.
//!
//! Both gateways run this before every operation that touches a conversation.
//! Verdicts are never cached: the event row and the caller's privileged flag
//! are read on each call, so removing a participant takes effect on their
//! next operation, including over an already-open WebSocket.

use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::directory::{self, EventRecord};
use crate::error::MessagingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Requester,
    Assignee,
    Privileged,
}

/// A caller admitted to an event's conversation. The role is relative to the
/// checked event: a privileged user who requested the event reports
/// `Requester`.
#[derive(Debug, Clone)]
pub struct Participant {
    pub event: EventRecord,
    pub user_id: i64,
    pub role: ParticipantRole,
}

pub async fn authorize(
    pool: &SqlitePool,
    event_public_id: &str,
    user_id: i64,
) -> Result<Participant, MessagingError> {
    let event = directory::require_event(pool, event_public_id).await?;

    let role = if event.requester_id == Some(user_id) {
        ParticipantRole::Requester
    } else if event.assignee_id == Some(user_id) {
        ParticipantRole::Assignee
    } else if is_privileged(pool, user_id).await? {
        ParticipantRole::Privileged
    } else {
        return Err(MessagingError::Forbidden);
    };

    Ok(Participant {
        event,
        user_id,
        role,
    })
}

async fn is_privileged(pool: &SqlitePool, user_id: i64) -> Result<bool, MessagingError> {
    let is_admin: Option<bool> = sqlx::query_scalar("SELECT is_admin FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(is_admin.unwrap_or(false))
}
