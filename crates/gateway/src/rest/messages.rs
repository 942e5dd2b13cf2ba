use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json, Router,
};
use marquee_messaging::{guard, store, NewMessage, ReadOutcome, StoredMessage};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{util::require_bearer, ws::protocol::ServerEvent, ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct MessagesResponse {
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub message_ids: Vec<String>,
}

/// Create the event conversation routes
pub fn create_message_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/events/:event_id/messages",
            axum::routing::get(get_history).post(send_message),
        )
        .route(
            "/api/events/:event_id/messages/read",
            axum::routing::post(mark_read),
        )
}

// Post a message into an event conversation
#[utoipa::path(
    post,
    path = "/api/events/{event_id}/messages",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(
        ("event_id" = String, Path, description = "Event public identifier")
    ),
    request_body = NewMessage,
    responses(
        (status = 201, description = "Message stored", body = StoredMessage),
        (status = 400, description = "Empty or oversized message", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Not a participant of this event", body = crate::error::ErrorResponse),
        (status = 404, description = "Event not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to store message", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<NewMessage>,
) -> Result<(StatusCode, Json<StoredMessage>), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let participant = guard::authorize(state.db_pool(), &event_id, user.id).await?;
    let message = store::create(state.db_pool(), &participant.event, user.id, payload).await?;

    // Live subscribers see REST-posted messages too.
    state
        .registry()
        .broadcast(&event_id, ServerEvent::MessageCreated(message.clone()))
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

// Fetch an event's full message history, oldest first
#[utoipa::path(
    get,
    path = "/api/events/{event_id}/messages",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(
        ("event_id" = String, Path, description = "Event public identifier")
    ),
    responses(
        (status = 200, description = "List event messages", body = MessagesResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Not a participant of this event", body = crate::error::ErrorResponse),
        (status = 404, description = "Event not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to fetch messages", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessagesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let participant = guard::authorize(state.db_pool(), &event_id, user.id).await?;
    let messages = store::list_by_event(state.db_pool(), &participant.event).await?;

    Ok(Json(MessagesResponse { messages }))
}

// Record read receipts for a batch of messages
#[utoipa::path(
    post,
    path = "/api/events/{event_id}/messages/read",
    tag = "Messages",
    security(("bearerAuth" = [])),
    params(
        ("event_id" = String, Path, description = "Event public identifier")
    ),
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Newly read message ids", body = ReadOutcome),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Not a participant of this event", body = crate::error::ErrorResponse),
        (status = 404, description = "Event not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to record receipts", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<MarkReadRequest>,
) -> Result<Json<ReadOutcome>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let participant = guard::authorize(state.db_pool(), &event_id, user.id).await?;
    let outcome = store::mark_read(
        state.db_pool(),
        &participant.event,
        user.id,
        &payload.message_ids,
    )
    .await?;

    if !outcome.message_ids.is_empty() {
        state
            .registry()
            .broadcast(
                &event_id,
                ServerEvent::ReadReceiptsUpdated {
                    event_id: event_id.clone(),
                    user_id: user.public_id.clone(),
                    message_ids: outcome.message_ids.clone(),
                    read_at: outcome.read_at.clone(),
                },
            )
            .await;
    }

    Ok(Json(outcome))
}
