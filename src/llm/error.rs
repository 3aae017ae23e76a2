//! Error types for the generative model client.

use thiserror::Error;

/// Errors produced while talking to the hosted model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured.
    #[error("GEMINI_API_KEY is not configured in your .env file or is empty.")]
    MissingApiKey,
    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("model API returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The reply carried no text (blocked prompt or empty candidate list).
    #[error("model returned no content{}", .0.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    EmptyResponse(Option<String>),
}

/// Convenience result alias for model operations.
pub type LlmResult<T> = Result<T, LlmError>;
