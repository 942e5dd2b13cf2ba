//! Wire protocol for the messaging WebSocket.
//!
//! Clients send [`ClientCommand`] frames and receive [`ServerEvent`] frames,
//! both JSON envelopes of the form `{"type": ..., "data": ...}`.

use marquee_messaging::{AttachmentRef, ReadOutcome, StoredMessage};
use serde::{Deserialize, Serialize};

/// Commands a connected client may issue.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    /// Subscribe this connection to an event's message room.
    Join { event_id: String },
    /// Signal that the user started or stopped composing.
    Typing { event_id: String, is_typing: bool },
    /// Post a message into an event room.
    Send {
        event_id: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        attachment: Option<AttachmentRef>,
    },
    /// Acknowledge having read the given messages.
    MarkRead {
        event_id: String,
        message_ids: Vec<String>,
    },
}

/// Frames the server pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Greeting sent once after a successful upgrade.
    Connected { user_id: String },
    /// Acknowledges a `join` command.
    Joined { event_id: String },
    /// Acknowledges a `typing` command.
    TypingSent,
    /// Acknowledges a `send` command with the stored message.
    MessageSent(StoredMessage),
    /// Acknowledges a `markRead` command.
    ReadAck(ReadOutcome),
    /// A message was posted in a room this connection joined.
    MessageCreated(StoredMessage),
    /// Another participant's composing state changed.
    TypingChanged {
        event_id: String,
        user_id: String,
        is_typing: bool,
    },
    /// A participant read messages in a joined room.
    ReadReceiptsUpdated {
        event_id: String,
        user_id: String,
        message_ids: Vec<String>,
        read_at: String,
    },
    /// A command failed; the connection stays open.
    Error { kind: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_full_command_set() {
        let join: ClientCommand =
            serde_json::from_str(r#"{"type":"join","data":{"eventId":"evt_1"}}"#)
                .expect("join should parse");
        assert!(matches!(join, ClientCommand::Join { event_id } if event_id == "evt_1"));

        let typing: ClientCommand = serde_json::from_str(
            r#"{"type":"typing","data":{"eventId":"evt_1","isTyping":true}}"#,
        )
        .expect("typing should parse");
        assert!(matches!(
            typing,
            ClientCommand::Typing { is_typing: true, .. }
        ));

        let send: ClientCommand = serde_json::from_str(
            r#"{"type":"send","data":{"eventId":"evt_1","content":"hello"}}"#,
        )
        .expect("send should parse");
        match send {
            ClientCommand::Send {
                content,
                attachment,
                ..
            } => {
                assert_eq!(content.as_deref(), Some("hello"));
                assert!(attachment.is_none());
            }
            other => panic!("expected send, got {other:?}"),
        }

        let mark: ClientCommand = serde_json::from_str(
            r#"{"type":"markRead","data":{"eventId":"evt_1","messageIds":["m1","m2"]}}"#,
        )
        .expect("markRead should parse");
        assert!(matches!(
            mark,
            ClientCommand::MarkRead { message_ids, .. } if message_ids.len() == 2
        ));
    }

    #[test]
    fn send_fields_are_optional() {
        let send: ClientCommand = serde_json::from_str(
            r#"{"type":"send","data":{"eventId":"evt_1","attachment":{"reference":"abc.png","name":"pic.png","mediaType":"image/png","sizeBytes":12}}}"#,
        )
        .expect("attachment-only send should parse");
        match send {
            ClientCommand::Send {
                content,
                attachment,
                ..
            } => {
                assert!(content.is_none());
                assert_eq!(attachment.expect("attachment").reference, "abc.png");
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_command_types() {
        let result: Result<ClientCommand, _> =
            serde_json::from_str(r#"{"type":"shout","data":{"eventId":"evt_1"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_events_use_the_tagged_envelope() {
        let frame = serde_json::to_value(ServerEvent::TypingChanged {
            event_id: "evt_1".to_string(),
            user_id: "usr_1".to_string(),
            is_typing: false,
        })
        .expect("event should serialize");
        assert_eq!(frame["type"], "typingChanged");
        assert_eq!(frame["data"]["eventId"], "evt_1");
        assert_eq!(frame["data"]["isTyping"], false);
    }

    #[test]
    fn unit_events_serialize_without_data() {
        let frame = serde_json::to_value(ServerEvent::TypingSent).expect("should serialize");
        assert_eq!(frame["type"], "typingSent");
        assert!(frame.get("data").is_none());
    }

    #[test]
    fn error_events_carry_kind_and_message() {
        let frame = serde_json::to_value(ServerEvent::Error {
            kind: "validation",
            message: "message requires text content or an attachment".to_string(),
        })
        .expect("error should serialize");
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["data"]["kind"], "validation");
    }
}
