//! Shared helpers for the request handlers.

use axum::extract::Multipart;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;

/// Extensions accepted for photo and avatar uploads.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// `?user_id=` query parameter, shared by most authenticated endpoints.
#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: String,
}

/// A file received via multipart upload.
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Pull the `file` part out of a multipart body.
pub async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::validation("file part is missing a filename"))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("failed to read file part: {e}")))?;
            return Ok(UploadedFile { filename, bytes });
        }
    }
    Err(ApiError::validation("missing file part"))
}

/// Lower-cased extension of an uploaded filename, checked against the image
/// allow-list. Runs before any storage or database call.
pub fn require_image_extension(filename: &str) -> Result<String, ApiError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::validation("filename has no extension"))?;
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::validation(format!(
            "unsupported file type .{ext}; allowed: jpg, jpeg, png"
        )));
    }
    Ok(ext)
}

/// Current time in the RFC 3339 form the database stores.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Parse a stored timestamp. Accepts RFC 3339 and SQLite's
/// "YYYY-MM-DD HH:MM:SS" default form; corrupt values are logged and
/// replaced with the epoch rather than failing the whole response.
pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}
