//! Chat proxy handler.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use tracing::info;

use crate::llm::{ChatReply, LlmError, parse_reply};
use crate::store::{Message, Sender};

use super::error::ApiError;
use super::state::AppState;

/// One turn of the history as the client sends it.
///
/// `sender` is free-form: `"user"` is the user, anything else the model.
/// Extra fields such as display hints are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ChatTurn {
    /// Author as sent by the client.
    #[serde(default)]
    pub sender: Option<String>,
    /// Turn text.
    #[serde(default)]
    pub text: String,
}

impl From<ChatTurn> for Message {
    fn from(turn: ChatTurn) -> Self {
        let sender = match turn.sender.as_deref() {
            Some("user") => Sender::User,
            _ => Sender::Model,
        };
        Self::new(sender, turn.text)
    }
}

/// Body of `POST /chat/`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation history, oldest first.
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
}

/// `POST /chat/`: forward the history to the model and classify its reply.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload?;
    if !state.chat.is_configured() {
        return Err(LlmError::MissingApiKey.into());
    }
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("Messages are required"));
    }

    let history: Vec<Message> = request.messages.into_iter().map(Message::from).collect();
    let raw = state.chat.generate(&history).await?;
    let reply = parse_reply(&raw);
    info!(
        kind = match reply {
            ChatReply::Document { .. } => "document",
            ChatReply::Question { .. } => "question",
        },
        chars = reply.text().len(),
        "model replied"
    );
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::server::testing::{TestApp, json_request};
    use crate::store::Sender;

    fn history() -> serde_json::Value {
        json!({"messages": [
            {"sender": "user", "text": "I need an NDA"},
            {"sender": "bot", "text": "Who are the parties?"},
            {"sender": "user", "text": "Acme and Beta"}
        ]})
    }

    #[tokio::test]
    async fn test_document_reply() {
        let app = TestApp::with_reply(Some(
            "Here it is:\n```json\n{\"type\": \"document\", \"text\": \"# NDA\"}\n```",
        ))
        .await;
        let (status, body) = app
            .send_json(json_request(Method::POST, "/api/chat/", &history()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"type": "document", "text": "# NDA"}));

        let seen = app.chat.histories();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 3);
        assert_eq!(seen[0][1].sender, Sender::Model);
    }

    #[tokio::test]
    async fn test_plain_reply_is_question() {
        let app = TestApp::with_reply(Some("What is the effective date?")).await;
        let (status, body) = app
            .send_json(json_request(Method::POST, "/api/chat/", &history()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"type": "question", "text": "What is the effective date?"})
        );
    }

    #[tokio::test]
    async fn test_messages_required() {
        let app = TestApp::new().await;
        for body in [json!({}), json!({"messages": []})] {
            let (status, body) = app
                .send_json(json_request(Method::POST, "/api/chat/", &body))
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Messages are required");
        }
        assert!(app.chat.histories().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_is_server_error() {
        let app = TestApp::with_reply(None).await;
        let (status, body) = app
            .send_json(json_request(Method::POST, "/api/chat/", &history()))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "GEMINI_API_KEY is not configured in your .env file or is empty."
        );
    }

    #[tokio::test]
    async fn test_key_checked_before_messages() {
        let app = TestApp::with_reply(None).await;
        let (status, body) = app
            .send_json(json_request(Method::POST, "/api/chat/", &json!({"messages": []})))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "GEMINI_API_KEY is not configured in your .env file or is empty."
        );
        assert!(app.chat.histories().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_senders_are_model_turns() {
        let app = TestApp::new().await;
        let body = json!({"messages": [
            {"sender": "system", "text": "Be brief"},
            {"sender": "bot", "type": "document_context", "text": "# Lease"},
            {"text": "no sender"},
            {"sender": "user", "text": "Add a pet clause"}
        ]});
        let (status, _) = app
            .send_json(json_request(Method::POST, "/api/chat/", &body))
            .await;
        assert_eq!(status, StatusCode::OK);

        let seen = app.chat.histories();
        let senders: Vec<Sender> = seen[0].iter().map(|m| m.sender).collect();
        assert_eq!(
            senders,
            vec![Sender::Model, Sender::Model, Sender::Model, Sender::User]
        );
        assert_eq!(seen[0][0].text, "Be brief");
    }
}
