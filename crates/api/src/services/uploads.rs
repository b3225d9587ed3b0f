//! Image upload storage.
//!
//! Files are accepted only when both the declared content type and the
//! leading magic bytes name the same supported image format. They are stored
//! under a random name in the upload directory and served from `/uploads/`.

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::UploadConfig;

/// Errors from storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file provided (expected a 'file' or 'image' field)")]
    MissingFile,

    #[error("Uploaded file is empty")]
    Empty,

    #[error("File is too large (maximum {max} bytes)")]
    TooLarge { max: usize },

    #[error("Unsupported file type. Allowed: JPEG, PNG, GIF, WebP")]
    UnsupportedType,

    #[error("File content does not match its declared type")]
    ContentMismatch,

    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Parse a declared MIME type, ignoring parameters and case.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Detect the format from the file's leading bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// A stored upload, as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub content_type: &'static str,
}

/// Check an upload against the size limit and the supported formats.
///
/// # Errors
///
/// Returns `UploadError::Empty`, `UploadError::TooLarge`,
/// `UploadError::UnsupportedType` or `UploadError::ContentMismatch`.
pub fn validate_image(
    declared_type: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<ImageKind, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(UploadError::TooLarge { max: max_bytes });
    }

    let declared = declared_type
        .and_then(ImageKind::from_mime)
        .ok_or(UploadError::UnsupportedType)?;
    let detected = ImageKind::sniff(bytes).ok_or(UploadError::ContentMismatch)?;

    if declared != detected {
        return Err(UploadError::ContentMismatch);
    }
    Ok(detected)
}

/// Validate and write an image into the upload directory.
///
/// # Errors
///
/// Returns a validation error from [`validate_image`] or `UploadError::Io`
/// if the file cannot be written.
pub async fn store_image(
    config: &UploadConfig,
    base_url: &str,
    declared_type: Option<&str>,
    bytes: &[u8],
) -> Result<StoredUpload, UploadError> {
    let kind = validate_image(declared_type, bytes, config.max_bytes)?;

    let filename = format!("{}.{}", Uuid::new_v4().simple(), kind.extension());
    tokio::fs::create_dir_all(&config.dir).await?;
    tokio::fs::write(config.dir.join(&filename), bytes).await?;

    info!(%filename, size = bytes.len(), content_type = kind.mime(), "Upload stored");

    Ok(StoredUpload {
        url: format!("{}/uploads/{filename}", base_url.trim_end_matches('/')),
        filename,
        size: bytes.len(),
        content_type: kind.mime(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16];
    const WEBP: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 ";

    #[test]
    fn test_sniff() {
        assert_eq!(ImageKind::sniff(PNG), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(JPEG), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(WEBP), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"<?php echo 1;"), None);
        assert_eq!(ImageKind::sniff(b"RIFF\x00\x00\x00\x00WAVE"), None);
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageKind::from_mime("image/PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("image/jpeg; charset=binary"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("image/svg+xml"), None);
        assert_eq!(ImageKind::from_mime("application/octet-stream"), None);
    }

    #[test]
    fn test_validate_image() {
        assert_eq!(validate_image(Some("image/png"), PNG, 1024).unwrap(), ImageKind::Png);
        assert!(matches!(
            validate_image(Some("image/png"), &[], 1024),
            Err(UploadError::Empty)
        ));
        assert!(matches!(
            validate_image(Some("image/png"), PNG, 4),
            Err(UploadError::TooLarge { max: 4 })
        ));
        assert!(matches!(
            validate_image(None, PNG, 1024),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            validate_image(Some("image/jpeg"), PNG, 1024),
            Err(UploadError::ContentMismatch)
        ));
        assert!(matches!(
            validate_image(Some("image/gif"), b"not an image", 1024),
            Err(UploadError::ContentMismatch)
        ));
    }

    #[tokio::test]
    async fn test_store_image_writes_file() {
        let dir = std::env::temp_dir().join(format!("shopfront-upload-{}", Uuid::new_v4()));
        let config = UploadConfig {
            dir: dir.clone(),
            max_bytes: 1024,
        };

        let stored = store_image(&config, "http://localhost:8000/", Some("image/png"), PNG)
            .await
            .unwrap();

        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.url, format!("http://localhost:8000/uploads/{}", stored.filename));
        assert_eq!(stored.size, PNG.len());
        assert_eq!(std::fs::read(dir.join(&stored.filename)).unwrap(), PNG);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
