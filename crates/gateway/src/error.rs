use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use marquee_auth::AuthError;
use marquee_messaging::MessagingError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// The one error type handlers return. Domain errors convert into it at the
/// route boundary; the status code is the client-facing taxonomy.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Error")
                .to_owned(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials
            | AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::InvalidSession => Self::unauthorized(error.to_string()),
            AuthError::UserExists | AuthError::WeakPassword => {
                Self::bad_request(error.to_string())
            }
            AuthError::Database(_) | AuthError::PasswordHash(_) => {
                error!(error = ?error, "auth internals failed");
                Self::internal_server_error("internal error")
            }
        }
    }
}

impl From<MessagingError> for ApiError {
    fn from(error: MessagingError) -> Self {
        match error {
            MessagingError::NotFound => Self::not_found(error.to_string()),
            MessagingError::Forbidden => Self::forbidden(error.to_string()),
            MessagingError::Validation(message) => Self::bad_request(message),
            MessagingError::Upload(message) => Self::unprocessable(message),
            MessagingError::Database(_) | MessagingError::Storage(_) => {
                error!(error = ?error, "messaging internals failed");
                Self::internal_server_error("internal error")
            }
        }
    }
}
