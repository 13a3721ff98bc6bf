//! Serving images from local backends.

use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use menuboard_core::image::content_type_for;
use menuboard_storage::{AssetStore, StorageError};
use std::sync::Arc;

/// GET {public_path}/{file} - Image bytes from a mounted backend.
pub async fn serve_asset(
    State(backend): State<Arc<dyn AssetStore>>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    let data = match backend.get(&file).await {
        Ok(data) => data,
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidKey(_)) => {
            return Err(ApiError::NotFound(format!("{file} not found")));
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        [
            (CONTENT_TYPE, content_type_for(&file)),
            (CACHE_CONTROL, "no-cache"),
        ],
        data,
    )
        .into_response())
}
