//! WebSocket endpoint for live event conversations.
//!
//! Clients authenticate with a `?token=` query parameter before the upgrade;
//! a bad token is rejected with 401 and no socket is opened. Once upgraded,
//! the protocol in [`crate::ws::protocol`] applies. Command failures are
//! reported as `error` frames and never close the connection. Access is
//! re-checked against the database on every command, so a revoked
//! participant loses the room as soon as they issue another command.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use marquee_auth::User;
use marquee_messaging::{guard, store, MessagingError, NewMessage};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::state::AppState;
use crate::ws::protocol::{ClientCommand, ServerEvent};
use crate::ws::registry::ConnectionId;

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "WebSocket",
    params(
        ("token" = String, Query, description = "Session token issued at login")
    ),
    responses(
        (status = 101, description = "Connection upgraded to the messaging protocol"),
        (status = 401, description = "Missing, expired, or unknown session token")
    )
)]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WebSocketQuery>,
    State(state): State<AppState>,
) -> Result<Response, StatusCode> {
    let token = query.token.ok_or(StatusCode::UNAUTHORIZED)?;
    let (user, _session) = state
        .authenticate(&token)
        .await
        .map_err(|error| error.status)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(100);

    let sender_task = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(encode_error) => {
                    error!(error = ?encode_error, "failed to encode websocket frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let connection = state
        .registry()
        .register(&user.public_id, out_tx.clone())
        .await;
    debug!(connection, user = %user.public_id, "websocket connected");

    let _ = out_tx
        .send(ServerEvent::Connected {
            user_id: user.public_id.clone(),
        })
        .await;

    while let Some(received) = ws_rx.next().await {
        let message = match received {
            Ok(message) => message,
            Err(receive_error) => {
                debug!(connection, error = ?receive_error, "websocket receive failed");
                break;
            }
        };
        match message {
            Message::Text(text) => {
                if out_tx.is_closed() {
                    break;
                }
                let command = match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => command,
                    Err(parse_error) => {
                        debug!(connection, error = ?parse_error, "unparseable websocket command");
                        let _ = out_tx
                            .send(ServerEvent::Error {
                                kind: "validation",
                                message: "unrecognized command".to_string(),
                            })
                            .await;
                        continue;
                    }
                };
                if let Err(command_error) =
                    handle_command(&state, &user, connection, &out_tx, command).await
                {
                    let _ = out_tx.send(error_frame(command_error)).await;
                }
            }
            Message::Close(_) => break,
            // Axum answers pings itself; binary frames are not part of the protocol.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    state.registry().remove(connection).await;
    sender_task.abort();
    debug!(connection, user = %user.public_id, "websocket disconnected");
}

async fn handle_command(
    state: &AppState,
    user: &User,
    connection: ConnectionId,
    out_tx: &mpsc::Sender<ServerEvent>,
    command: ClientCommand,
) -> Result<(), MessagingError> {
    match command {
        ClientCommand::Join { event_id } => {
            guard::authorize(state.db_pool(), &event_id, user.id).await?;
            state.registry().join(connection, &event_id).await;
            let _ = out_tx.send(ServerEvent::Joined { event_id }).await;
        }
        ClientCommand::Typing {
            event_id,
            is_typing,
        } => {
            if !state.registry().has_joined(connection, &event_id).await {
                return Err(MessagingError::validation(
                    "join the event before sending typing updates",
                ));
            }
            guard::authorize(state.db_pool(), &event_id, user.id).await?;
            state
                .registry()
                .broadcast_except(
                    &event_id,
                    connection,
                    ServerEvent::TypingChanged {
                        event_id: event_id.clone(),
                        user_id: user.public_id.clone(),
                        is_typing,
                    },
                )
                .await;
            let _ = out_tx.send(ServerEvent::TypingSent).await;
        }
        ClientCommand::Send {
            event_id,
            content,
            attachment,
        } => {
            let participant = guard::authorize(state.db_pool(), &event_id, user.id).await?;
            let message = store::create(
                state.db_pool(),
                &participant.event,
                user.id,
                NewMessage {
                    content,
                    attachment,
                },
            )
            .await?;
            let _ = out_tx
                .send(ServerEvent::MessageSent(message.clone()))
                .await;
            state
                .registry()
                .broadcast(&event_id, ServerEvent::MessageCreated(message))
                .await;
        }
        ClientCommand::MarkRead {
            event_id,
            message_ids,
        } => {
            let participant = guard::authorize(state.db_pool(), &event_id, user.id).await?;
            let outcome =
                store::mark_read(state.db_pool(), &participant.event, user.id, &message_ids)
                    .await?;
            let _ = out_tx.send(ServerEvent::ReadAck(outcome.clone())).await;
            if !outcome.message_ids.is_empty() {
                state
                    .registry()
                    .broadcast(
                        &event_id,
                        ServerEvent::ReadReceiptsUpdated {
                            event_id: event_id.clone(),
                            user_id: user.public_id.clone(),
                            message_ids: outcome.message_ids,
                            read_at: outcome.read_at,
                        },
                    )
                    .await;
            }
        }
    }
    Ok(())
}

fn error_frame(error: MessagingError) -> ServerEvent {
    let message = match &error {
        MessagingError::Database(_) | MessagingError::Storage(_) => {
            error!(error = ?error, "messaging internals failed");
            "internal error".to_string()
        }
        other => other.to_string(),
    };
    ServerEvent::Error {
        kind: error.kind(),
        message,
    }
}
