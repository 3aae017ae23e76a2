//! Test harness: the full router over an in-memory store and a scripted model.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::llm::{ChatModel, LlmError, LlmResult};
use crate::store::{Message, SqliteConversationStore};

use super::{AppState, create_router};

/// Chat model returning a fixed reply and recording what it was sent.
pub struct ScriptedChat {
    reply: Option<String>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChat {
    /// Histories passed to `generate`, in call order.
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    fn is_configured(&self) -> bool {
        self.reply.is_some()
    }

    async fn generate(&self, history: &[Message]) -> LlmResult<String> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.reply.clone().ok_or(LlmError::MissingApiKey)
    }
}

/// Router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<SqliteConversationStore>,
    pub chat: Arc<ScriptedChat>,
    media: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(Some("What are the names of the parties?"), None).await
    }

    /// `None` makes the model fail as if no API key were configured.
    pub async fn with_reply(reply: Option<&str>) -> Self {
        Self::build(reply, None).await
    }

    pub async fn with_max_upload(max_bytes: usize) -> Self {
        Self::build(None, Some(max_bytes)).await
    }

    async fn build(reply: Option<&str>, max_upload: Option<usize>) -> Self {
        let media = TempDir::new().unwrap();
        let mut config = AppConfig::new().with_media_dir(media.path());
        if let Some(max) = max_upload {
            config.uploads.max_bytes = max;
        }

        let store = Arc::new(SqliteConversationStore::open_in_memory().await.unwrap());
        let chat = Arc::new(ScriptedChat {
            reply: reply.map(str::to_string),
            seen: Mutex::new(Vec::new()),
        });
        let state = AppState::new(store.clone(), chat.clone(), config);

        Self {
            router: create_router(state),
            store,
            chat,
            media,
        }
    }

    pub fn media_dir(&self) -> &Path {
        self.media.path()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Bytes) {
        let (status, _, bytes) = self.send_raw(request).await;
        (status, bytes)
    }

    /// Send and decode a JSON body (`Null` when empty).
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send_json(Self::get(uri)).await
    }
}

pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
