//! Signature image upload.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::UploadConfig;
use crate::store::ids::UploadId;

use super::error::ApiError;
use super::state::AppState;

/// Multipart field holding the image.
pub const SIGNATURE_FIELD: &str = "signature";
/// Subdirectory of the media directory for signatures.
pub const SIGNATURES_DIR: &str = "signatures";
/// URL prefix the media directory is served under.
pub const MEDIA_PREFIX: &str = "/media";

/// Map a content type or file extension to the stored extension.
fn image_extension(content_type: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
    let by_type = content_type.and_then(|ct| {
        let essence = ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some("png"),
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/webp" => Some("webp"),
            _ => None,
        }
    });
    if by_type.is_some() {
        return by_type;
    }

    // Browsers send application/octet-stream for some pasted images.
    let generic = content_type.is_none_or(|ct| ct.starts_with("application/octet-stream"));
    if !generic {
        return None;
    }
    let ext = FsPath::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpg"),
        "webp" => Some("webp"),
        _ => None,
    }
}

/// Public URL of a stored signature.
fn public_url(config: &UploadConfig, file_name: &str) -> String {
    let path = format!("{MEDIA_PREFIX}/{SIGNATURES_DIR}/{file_name}");
    match config.public_base_url.as_deref() {
        Some(base) => format!("{}{path}", base.trim_end_matches('/')),
        None => path,
    }
}

/// `POST /upload-signature/`: store the image and return its URL.
pub async fn upload_signature(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let config = &state.config.uploads;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(SIGNATURE_FIELD) {
            continue;
        }

        let Some(ext) = image_extension(field.content_type(), field.file_name()) else {
            warn!(
                content_type = field.content_type().unwrap_or("-"),
                "rejected signature upload"
            );
            return Err(ApiError::bad_request(
                "Unsupported file type. Use PNG, JPEG or WebP.",
            ));
        };

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        if bytes.len() > config.max_bytes {
            return Err(ApiError::bad_request(format!(
                "File too large (max {} bytes)",
                config.max_bytes
            )));
        }

        let dir = config.media_dir.join(SIGNATURES_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        let file_name = format!("{}.{ext}", UploadId::new());
        tokio::fs::write(dir.join(&file_name), &bytes).await?;

        let url = public_url(config, &file_name);
        info!(%url, bytes = bytes.len(), "signature stored");
        return Ok((StatusCode::CREATED, Json(json!({ "url": url }))));
    }

    Err(ApiError::bad_request("No signature file provided"))
}
