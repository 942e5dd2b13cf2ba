//! REST endpoints served by [`crate::build_router`].

pub mod auth;
pub mod health;
pub mod messages;
pub mod uploads;

use axum::Router;

use crate::state::AppState;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<AppState> {
    Router::new()
        .route("/health", axum::routing::get(health::health_check))
        // Account and session routes
        .merge(auth::create_auth_routes())
        // Conversation routes
        .merge(messages::create_message_routes())
        // Attachment blob routes
        .merge(uploads::create_upload_routes())
}
