//! Menu gallery endpoints.

use crate::auth::AdminSession;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

/// Response listing display URLs, admin image first.
#[derive(Debug, Serialize)]
pub struct MenuImagesResponse {
    pub images: Vec<String>,
}

/// Response for a stored admin image.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub url: String,
}

/// Request to delete the admin image.
#[derive(Debug, Deserialize)]
pub struct DeleteImageRequest {
    #[serde(default)]
    pub filename: String,
}

/// Response for a deleted admin image.
#[derive(Debug, Serialize)]
pub struct DeleteImageResponse {
    pub success: bool,
    pub deleted: Vec<String>,
}

/// GET /api/menu-images - Ordered display URLs across all backends.
///
/// Backend failures only shrink the list; this endpoint never errors.
pub async fn list_images(State(state): State<AppState>) -> Json<MenuImagesResponse> {
    let resolved = state.gallery.resolve_report().await;
    for backend in &resolved.failed_backends {
        metrics::BACKEND_LISTING_FAILURES
            .with_label_values(&[*backend])
            .inc();
    }
    metrics::IMAGES_RESOLVED.inc_by(resolved.images.len() as u64);

    Json(MenuImagesResponse {
        images: resolved.images.into_iter().map(|record| record.url).collect(),
    })
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(format!("invalid multipart body: {}", e.body_text()))
    }
}

/// POST /api/upload - Replace the admin image.
pub async fn upload_image(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let original_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        tracing::info!(
            user = %session.username,
            original_name = ?original_name,
            content_type = %content_type,
            size = data.len(),
            "Admin image upload"
        );

        let stored = state.gallery.upload(data, &content_type).await?;
        metrics::ADMIN_UPLOADS.inc();

        return Ok(Json(UploadResponse {
            success: true,
            filename: stored.key,
            url: stored.url,
        }));
    }

    Err(ApiError::BadRequest("no file uploaded".to_string()))
}

/// POST /api/delete-image - Remove the admin image.
pub async fn delete_image(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    payload: Result<Json<DeleteImageRequest>, JsonRejection>,
) -> ApiResult<Json<DeleteImageResponse>> {
    let Json(request) = payload?;
    let deleted = state.gallery.delete(&request.filename).await?;
    metrics::ADMIN_DELETES.inc();
    tracing::info!(user = %session.username, keys = ?deleted, "Admin image removed");

    Ok(Json(DeleteImageResponse {
        success: true,
        deleted,
    }))
}
