//! Realtime socket endpoint and the fan-out plumbing behind it.

pub mod handler;
pub mod protocol;
pub mod registry;

use axum::Router;

use crate::state::AppState;

/// Create the WebSocket routes
pub fn create_websocket_routes() -> Router<AppState> {
    Router::new().route("/ws", axum::routing::get(handler::websocket_handler))
}
