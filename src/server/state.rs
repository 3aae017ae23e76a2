//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::ChatModel;
use crate::store::ConversationStore;

/// Shared application state, immutable after startup.
pub struct AppState {
    /// Conversation collection.
    pub store: Arc<dyn ConversationStore>,
    /// Chat backend.
    pub chat: Arc<dyn ChatModel>,
    /// Configuration the server was started with.
    pub config: AppConfig,
}

impl AppState {
    /// Bundle the collaborators into shared state.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        chat: Arc<dyn ChatModel>,
        config: AppConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            chat,
            config,
        })
    }
}
