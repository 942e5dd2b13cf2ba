//! HTTP and WebSocket surface for the Marquee messaging backend.
//!
//! [`build_router`] assembles the REST endpoints, the realtime socket, and
//! the Swagger UI over a shared [`AppState`]. Authentication is per request:
//! REST handlers read a bearer token, the WebSocket reads a `?token=` query
//! parameter before the upgrade.

mod docs;
mod error;
mod middleware;
mod state;
mod util;

pub mod rest;
pub mod ws;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    middleware as axum_middleware, Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Roomier than the attachment ceiling so the ingestor, not the transport,
// rejects oversized files with a proper error body.
const BODY_LIMIT_BYTES: usize = 8 * 1024 * 1024;

/// Create the main application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // REST API routes
        .merge(rest::create_rest_routes().with_state(state.clone()))
        // WebSocket routes
        .merge(ws::create_websocket_routes().with_state(state))
        // OpenAPI documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors_layer())
        .layer(axum_middleware::from_fn(middleware::log_requests))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
