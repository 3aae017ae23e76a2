//! Hosted generative model integration.
//!
//! - [`GeminiClient`] posts the chat history to Gemini
//! - [`parse_reply`] classifies the answer as a document or a question

pub mod error;
pub mod gemini;
pub mod reply;

pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use reply::{ChatReply, parse_reply};

use async_trait::async_trait;

use crate::store::Message;

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Whether the backend has the credentials it needs.
    fn is_configured(&self) -> bool {
        true
    }

    /// Generate the next model turn for a conversation history and return its raw text.
    ///
    /// # Errors
    /// Returns an error if the model is unconfigured or the call fails.
    async fn generate(&self, history: &[Message]) -> LlmResult<String>;
}
