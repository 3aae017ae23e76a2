//! PDF download handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::info;

use crate::pdf::{self, DEFAULT_FILENAME, MediaImages, PdfError};

use super::error::{ApiError, CONVERSATION_NOT_FOUND};
use super::extract::{parse_conversation_id, parse_version_number};
use super::state::AppState;

const NO_VERSIONS: &str = "No document versions found for this conversation.";
const VERSION_NOT_FOUND: &str = "Version not found";

/// Body of `POST /download-pdf/`.
#[derive(Debug, Deserialize)]
pub struct DownloadPdfRequest {
    /// Markdown to export.
    #[serde(default)]
    pub document_content: Option<String>,
}

/// Render on the blocking pool and wrap the bytes as an attachment.
/// Uploaded images linked from the markdown are embedded.
async fn pdf_response(
    state: &AppState,
    markdown: String,
    title: String,
    filename: String,
) -> Result<Response, ApiError> {
    if markdown.trim().is_empty() {
        return Err(PdfError::EmptyDocument.into());
    }

    let images = MediaImages::new(&state.config.uploads);
    let bytes = tokio::task::spawn_blocking(move || {
        pdf::render_pdf_with_images(&markdown, &title, &images)
    })
    .await??;
    info!(%filename, bytes = bytes.len(), "pdf exported");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// `POST /download-pdf/`
pub async fn download_pdf(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadPdfRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let content = request.document_content.unwrap_or_default();
    pdf_response(
        &state,
        content,
        "Legal Document".to_string(),
        DEFAULT_FILENAME.to_string(),
    )
    .await
}

/// `GET /conversations/{id}/download-latest-pdf/`
pub async fn download_latest_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_conversation_id(&id)?;
    let conversation = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(CONVERSATION_NOT_FOUND))?;
    let latest = conversation
        .document_versions
        .into_iter()
        .max_by_key(|v| v.version_number)
        .ok_or_else(|| ApiError::not_found(NO_VERSIONS))?;

    let filename = pdf::version_filename(&conversation.title, latest.version_number);
    pdf_response(&state, latest.content, conversation.title, filename).await
}

/// `GET /conversations/{id}/versions/{n}/download-pdf/`
pub async fn download_version_pdf(
    State(state): State<Arc<AppState>>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let id = parse_conversation_id(&id)?;
    let version_number = parse_version_number(&version, VERSION_NOT_FOUND)?;
    let conversation = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(CONVERSATION_NOT_FOUND))?;
    let version = conversation
        .document_versions
        .into_iter()
        .find(|v| v.version_number == version_number)
        .ok_or_else(|| ApiError::not_found(VERSION_NOT_FOUND))?;

    let filename = pdf::version_filename(&conversation.title, version_number);
    pdf_response(&state, version.content, conversation.title, filename).await
}
