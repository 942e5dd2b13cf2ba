use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json, Router,
};
use marquee_messaging::{
    ingest::{self, Upload},
    AttachmentRef,
};

use crate::{util::require_bearer, ApiError, AppState};

/// Create the attachment blob routes
pub fn create_upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/uploads", axum::routing::post(upload_attachment))
        .route(
            "/api/uploads/:reference",
            axum::routing::get(download_attachment),
        )
}

// Store an attachment blob ahead of the message that will reference it
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "Uploads",
    security(("bearerAuth" = [])),
    request_body(content = String, content_type = "multipart/form-data", description = "A single `file` part"),
    responses(
        (status = 201, description = "Attachment stored", body = AttachmentRef),
        (status = 400, description = "Malformed multipart body", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 422, description = "File empty, too large, or of an unsupported type", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to store attachment", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_attachment(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AttachmentRef>), ApiError> {
    let token = require_bearer(&headers)?;
    state.authenticate(&token).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let media_type = field.content_type().map(|value| value.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("Malformed multipart body"))?;
        upload = Some(Upload {
            file_name,
            media_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| ApiError::bad_request("Multipart field 'file' is required"))?;
    let attachment = ingest::ingest(&state.config().uploads, upload).await?;

    Ok((StatusCode::CREATED, Json(attachment)))
}

// Return a stored attachment's bytes under its original media type
#[utoipa::path(
    get,
    path = "/api/uploads/{reference}",
    tag = "Uploads",
    security(("bearerAuth" = [])),
    params(
        ("reference" = String, Path, description = "Storage reference returned by the upload endpoint")
    ),
    responses(
        (status = 200, description = "Attachment bytes"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Attachment not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to read attachment", body = crate::error::ErrorResponse)
    )
)]
pub async fn download_attachment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_bearer(&headers)?;
    state.authenticate(&token).await?;

    let blob = ingest::open_blob(&state.config().uploads, &reference).await?;

    Ok(([(header::CONTENT_TYPE, blob.media_type)], blob.bytes))
}
