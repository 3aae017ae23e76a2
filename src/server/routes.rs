//! Router assembly.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::services::ServeDir;

use super::state::AppState;
use super::uploads::MEDIA_PREFIX;
use super::{chat, conversations, documents, uploads};

/// Room for multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the router with every route; the API lives under `/api`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.uploads.max_bytes.saturating_add(MULTIPART_OVERHEAD);
    let media = ServeDir::new(&state.config.uploads.media_dir);

    let api = Router::new()
        .route(
            "/conversations/",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/conversations/{id}/",
            get(conversations::get_conversation)
                .put(conversations::update_conversation)
                .delete(conversations::delete_conversation),
        )
        .route(
            "/conversations/{id}/versions/{version}/content/",
            get(conversations::get_version_content),
        )
        .route(
            "/conversations/{id}/download-latest-pdf/",
            get(documents::download_latest_pdf),
        )
        .route(
            "/conversations/{id}/versions/{version}/download-pdf/",
            get(documents::download_version_pdf),
        )
        .route("/chat/", post(chat::chat))
        .route("/download-pdf/", post(documents::download_pdf))
        .route(
            "/upload-signature/",
            post(uploads::upload_signature).layer(DefaultBodyLimit::max(upload_limit)),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .nest_service(MEDIA_PREFIX, media)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "lexdraft",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
