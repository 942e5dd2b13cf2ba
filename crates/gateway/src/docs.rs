use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::rest::health::health_check,
        crate::rest::auth::register,
        crate::rest::auth::login,
        crate::rest::auth::me,
        crate::rest::messages::send_message,
        crate::rest::messages::get_history,
        crate::rest::messages::mark_read,
        crate::rest::uploads::upload_attachment,
        crate::rest::uploads::download_attachment,
        crate::ws::handler::websocket_handler
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::rest::health::HealthResponse,
            crate::rest::auth::RegisterRequest,
            crate::rest::auth::LoginRequest,
            crate::rest::auth::SessionResponse,
            crate::rest::auth::UserResponse,
            crate::rest::messages::MessagesResponse,
            crate::rest::messages::MarkReadRequest,
            marquee_messaging::AttachmentRef,
            marquee_messaging::MessageSender,
            marquee_messaging::NewMessage,
            marquee_messaging::ParticipantRole,
            marquee_messaging::ReadOutcome,
            marquee_messaging::ReadReceipt,
            marquee_messaging::StoredMessage
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Account registration and session management"),
        (name = "Messages", description = "Event conversation history and read receipts"),
        (name = "Uploads", description = "Attachment blob storage"),
        (name = "WebSocket", description = "Realtime messaging stream")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Bearer".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
