//! Admin image uploads.

use axum::{
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::response::{self, ApiResponse};
use crate::services::UploadError;
use crate::services::uploads::{StoredUpload, store_image};
use crate::state::AppState;

/// Multipart field names accepted for the file.
const FILE_FIELDS: [&str; 2] = ["file", "image"];

/// The image part of a multipart body.
pub struct ImagePart {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Read the first `file` or `image` field, skipping any other fields.
///
/// # Errors
///
/// Returns `UploadError::Multipart` for a body that is not multipart and
/// `UploadError::MissingFile` when no file field is present.
pub async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ImagePart, AppError> {
    let mut multipart = multipart.map_err(|e| UploadError::Multipart(e.body_text()))?;

    while let Some(field) = multipart.next_field().await? {
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }
        let content_type = field.content_type().map(String::from);
        let bytes = field.bytes().await?;
        return Ok(ImagePart {
            content_type,
            bytes,
        });
    }

    Err(UploadError::MissingFile.into())
}

/// `POST /api/admin/uploads`
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn upload(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<StoredUpload>, AppError> {
    let image = read_image(multipart).await?;
    let config = state.config();
    let stored = store_image(
        &config.uploads,
        &config.base_url,
        image.content_type.as_deref(),
        &image.bytes,
    )
    .await?;
    Ok(response::created(stored))
}
