//! Connection and room bookkeeping for the messaging WebSocket.
//!
//! Each upgraded socket registers once and may join any number of event
//! rooms. Broadcasts clone the frame per member and deliver through the
//! connection's outbound channel without blocking the registry lock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tracing::warn;

use crate::ws::protocol::ServerEvent;

/// Identifies one upgraded socket for the lifetime of the process.
pub type ConnectionId = u64;

struct ConnectionHandle {
    user_id: String,
    sender: mpsc::Sender<ServerEvent>,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

/// Shared registry of live connections and their event rooms.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    next_id: Arc<AtomicU64>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner::default())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a connection and returns its id.
    pub async fn register(&self, user_id: &str, sender: mpsc::Sender<ServerEvent>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock().await;
        inner.connections.insert(
            id,
            ConnectionHandle {
                user_id: user_id.to_string(),
                sender,
                rooms: HashSet::new(),
            },
        );
        id
    }

    /// Adds the connection to an event room. Joining twice is harmless.
    pub async fn join(&self, connection: ConnectionId, event_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.connections.get_mut(&connection) {
            handle.rooms.insert(event_id.to_string());
        } else {
            return;
        }
        inner
            .rooms
            .entry(event_id.to_string())
            .or_default()
            .insert(connection);
    }

    pub async fn has_joined(&self, connection: ConnectionId, event_id: &str) -> bool {
        let inner = self.inner.lock().await;
        inner
            .rooms
            .get(event_id)
            .map(|members| members.contains(&connection))
            .unwrap_or(false)
    }

    /// Delivers an event to every member of the room.
    pub async fn broadcast(&self, event_id: &str, event: ServerEvent) {
        self.deliver(event_id, None, event).await;
    }

    /// Delivers an event to every room member except one connection.
    pub async fn broadcast_except(
        &self,
        event_id: &str,
        except: ConnectionId,
        event: ServerEvent,
    ) {
        self.deliver(event_id, Some(except), event).await;
    }

    async fn deliver(&self, event_id: &str, except: Option<ConnectionId>, event: ServerEvent) {
        let targets: Vec<(ConnectionId, mpsc::Sender<ServerEvent>)> = {
            let inner = self.inner.lock().await;
            let Some(members) = inner.rooms.get(event_id) else {
                return;
            };
            members
                .iter()
                .filter(|id| Some(**id) != except)
                .filter_map(|id| {
                    inner
                        .connections
                        .get(id)
                        .map(|handle| (*id, handle.sender.clone()))
                })
                .collect()
        };

        for (connection, sender) in targets {
            match sender.try_send(event.clone()) {
                Ok(()) => {}
                // The socket task is tearing down; remove() will catch up.
                Err(TrySendError::Closed(_)) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(connection, "dropping event for slow websocket client");
                }
            }
        }
    }

    /// Looks up the public user id a connection authenticated as.
    pub async fn user_id(&self, connection: ConnectionId) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .connections
            .get(&connection)
            .map(|handle| handle.user_id.clone())
    }

    /// Drops a connection and its room memberships.
    pub async fn remove(&self, connection: ConnectionId) {
        let mut inner = self.inner.lock().await;
        let Some(handle) = inner.connections.remove(&connection) else {
            return;
        };
        for room in handle.rooms {
            if let Some(members) = inner.rooms.get_mut(&room) {
                members.remove(&connection);
                if members.is_empty() {
                    inner.rooms.remove(&room);
                }
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
