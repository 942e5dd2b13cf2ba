//! Wire-facing shapes of the conversation domain.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::guard::ParticipantRole;

/// Descriptor minted by the ingestor and later embedded in a message. Clients
/// pass it back verbatim when sending; the store persists it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub reference: String,
    pub name: String,
    pub media_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachment: Option<AttachmentRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub user_id: String,
    pub read_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub id: String,
    pub display_name: String,
    pub role: ParticipantRole,
}

/// A persisted message as both gateways return it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub event_id: String,
    pub sender_id: String,
    pub sender: MessageSender,
    pub content: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub created_at: String,
    pub read_by: Vec<ReadReceipt>,
}

/// Result of a mark-read call: only the receipts newly written by this call,
/// all sharing one timestamp.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadOutcome {
    pub message_ids: Vec<String>,
    pub read_at: String,
}
