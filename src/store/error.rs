//! Error types for the conversation store.

use thiserror::Error;

use super::ids::ConversationId;

/// Conversation store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No conversation with this identifier.
    #[error("conversation {0} not found")]
    NotFound(ConversationId),
    /// A stored value could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
