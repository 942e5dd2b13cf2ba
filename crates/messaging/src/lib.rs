//! Event-scoped messaging for the Marquee backend: conversation access
//! checks, message and read-receipt persistence, and attachment blobs.
//!
//! Gateways call into this crate with an already-authenticated user id.
//! Every operation re-checks event access against the events table at call
//! time; nothing about participation is cached between calls.

pub mod directory;
pub mod error;
pub mod guard;
pub mod ingest;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use directory::EventRecord;
pub use error::MessagingError;
pub use guard::{authorize, Participant, ParticipantRole};
pub use types::{
    AttachmentRef, MessageSender, NewMessage, ReadOutcome, ReadReceipt, StoredMessage,
};
