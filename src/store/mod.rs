//! Conversation document store.
//!
//! This module provides conversation CRUD operations with an append-only
//! document version history.

pub mod error;
pub mod ids;
pub mod sqlite;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use ids::ConversationId;
pub use sqlite::SqliteConversationStore;
pub use types::{
    Conversation, ConversationSummary, ConversationUpdate, DocumentVersion, Message,
    NewConversation, Sender,
};

use std::future::Future;
use std::pin::Pin;

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for the conversation collection.
pub trait ConversationStore: Send + Sync {
    /// List all conversations ordered by `updated_at` DESC.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn list_all(&self) -> StoreFuture<'_, StoreResult<Vec<ConversationSummary>>>;

    /// Get a conversation with its full version history.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_by_id(&self, id: ConversationId) -> StoreFuture<'_, StoreResult<Option<Conversation>>>;

    /// Create a conversation together with version 1 and return its new id.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn create(&self, new: NewConversation) -> StoreFuture<'_, StoreResult<ConversationId>>;

    /// Replace title and messages and append a new version. Returns the new version number.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the conversation does not exist.
    fn update(
        &self,
        id: ConversationId,
        update: ConversationUpdate,
    ) -> StoreFuture<'_, StoreResult<u32>>;

    /// Delete a conversation and every version it holds.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the conversation does not exist.
    fn delete(&self, id: ConversationId) -> StoreFuture<'_, StoreResult<()>>;

    /// Content of one version, or `None` if the conversation or version is missing.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn version_content(
        &self,
        id: ConversationId,
        version_number: u32,
    ) -> StoreFuture<'_, StoreResult<Option<String>>>;

    /// Highest-numbered version, or `None` if the conversation is missing.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn latest_version(
        &self,
        id: ConversationId,
    ) -> StoreFuture<'_, StoreResult<Option<DocumentVersion>>>;
}
