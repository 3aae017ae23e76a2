//! Conversation CRUD handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::store::{
    Conversation, ConversationSummary, ConversationUpdate, Message, NewConversation,
};

use super::error::{ApiError, CONVERSATION_NOT_FOUND};
use super::extract::{Uploader, parse_conversation_id, parse_version_number};
use super::state::AppState;

const TITLE_AND_MESSAGES_REQUIRED: &str = "Title and messages are required";
const NO_VERSIONS: &str = "No document versions found for this conversation.";
const VERSION_NOT_FOUND: &str = "Version content not found";

const DEFAULT_CREATE_NOTES: &str = "Initial Version";
const DEFAULT_UPDATE_NOTES: &str = "Version update via AI editor";

/// Body of `POST /conversations/`.
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// Display title.
    pub title: Option<String>,
    /// Chat history.
    pub messages: Option<Vec<Message>>,
    /// Content of version 1.
    #[serde(alias = "latest_document")]
    pub initial_document_content: Option<String>,
    /// Notes for version 1.
    pub notes: Option<String>,
}

/// Body of `PUT /conversations/{id}/`.
#[derive(Debug, Deserialize)]
pub struct UpdateConversationRequest {
    /// New display title.
    pub title: Option<String>,
    /// Replacement chat history.
    pub messages: Option<Vec<Message>>,
    /// Content of the appended version.
    #[serde(alias = "latest_document")]
    pub new_document_content: Option<String>,
    /// Notes for the appended version.
    pub notes: Option<String>,
}

/// Response of `PUT /conversations/{id}/`.
#[derive(Debug, Serialize)]
pub struct UpdateConversationResponse {
    /// Always `success`.
    pub status: &'static str,
    /// Number of the appended version.
    pub version_number: u32,
}

/// Response of `GET /conversations/{id}/`: the stored conversation plus
/// the content of its latest version.
#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    /// Stored conversation.
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Content of the highest-numbered version, `null` without versions.
    pub latest_document: Option<String>,
}

impl From<Conversation> for ConversationDetail {
    fn from(conversation: Conversation) -> Self {
        let latest_document = conversation.latest_document().map(str::to_string);
        Self {
            conversation,
            latest_document,
        }
    }
}

/// Title and messages must both be present and non-empty.
fn require_title_and_messages(
    title: Option<String>,
    messages: Option<Vec<Message>>,
) -> Result<(String, Vec<Message>), ApiError> {
    match (title, messages) {
        (Some(title), Some(messages)) if !title.trim().is_empty() && !messages.is_empty() => {
            Ok((title, messages))
        }
        _ => Err(ApiError::bad_request(TITLE_AND_MESSAGES_REQUIRED)),
    }
}

/// `GET /conversations/`
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let conversations = state.store.list_all().await?;
    Ok(Json(conversations))
}

/// `POST /conversations/`
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Uploader(uploaded_by): Uploader,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(request) = payload?;
    let (title, messages) = require_title_and_messages(request.title, request.messages)?;
    debug!(messages = messages.len(), "creating conversation");

    let id = state
        .store
        .create(NewConversation {
            title,
            messages,
            initial_content: request.initial_document_content,
            uploaded_by,
            notes: request
                .notes
                .unwrap_or_else(|| DEFAULT_CREATE_NOTES.to_string()),
        })
        .await?;

    info!(%id, "conversation created");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// `GET /conversations/{id}/`
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let id = parse_conversation_id(&id)?;
    state
        .store
        .get_by_id(id)
        .await?
        .map(|conversation| Json(ConversationDetail::from(conversation)))
        .ok_or_else(|| ApiError::not_found(CONVERSATION_NOT_FOUND))
}

/// `PUT /conversations/{id}/`
pub async fn update_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Uploader(uploaded_by): Uploader,
    payload: Result<Json<UpdateConversationRequest>, JsonRejection>,
) -> Result<Json<UpdateConversationResponse>, ApiError> {
    let id = parse_conversation_id(&id)?;
    let Json(request) = payload?;
    let (title, messages) = require_title_and_messages(request.title, request.messages)?;
    debug!(%id, messages = messages.len(), "updating conversation");

    let version_number = state
        .store
        .update(
            id,
            ConversationUpdate {
                title,
                messages,
                new_content: request.new_document_content,
                uploaded_by,
                notes: request
                    .notes
                    .unwrap_or_else(|| DEFAULT_UPDATE_NOTES.to_string()),
            },
        )
        .await?;

    info!(%id, version_number, "conversation updated");
    Ok(Json(UpdateConversationResponse {
        status: "success",
        version_number,
    }))
}

/// `DELETE /conversations/{id}/`
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_conversation_id(&id)?;
    state.store.delete(id).await?;
    info!(%id, "conversation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /conversations/{id}/versions/{n}/content/`
pub async fn get_version_content(
    State(state): State<Arc<AppState>>,
    Path((id, version)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_conversation_id(&id).map_err(|_| ApiError::not_found(NO_VERSIONS))?;
    let version_number = parse_version_number(&version, VERSION_NOT_FOUND)?;

    if state.store.latest_version(id).await?.is_none() {
        return Err(ApiError::not_found(NO_VERSIONS));
    }
    let content = state
        .store
        .version_content(id, version_number)
        .await?
        .ok_or_else(|| ApiError::not_found(VERSION_NOT_FOUND))?;

    Ok(Json(json!({ "content": content })))
}
