//! Request extractors shared by the handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::store::ConversationId;

use super::error::{ApiError, CONVERSATION_NOT_FOUND};

/// Header carrying the caller's identity.
pub const UPLOADED_BY_HEADER: &str = "x-uploaded-by";

/// Identity recorded with saved versions.
const ANONYMOUS: &str = "anonymous";

/// Caller identity taken from [`UPLOADED_BY_HEADER`], `anonymous` when absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uploader(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Uploader {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(UPLOADED_BY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS);
        Ok(Self(name.to_string()))
    }
}

/// Parse a path id; ids that do not parse address nothing.
pub fn parse_conversation_id(raw: &str) -> Result<ConversationId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(CONVERSATION_NOT_FOUND))
}

/// Parse a path version number.
pub fn parse_version_number(raw: &str, not_found: &str) -> Result<u32, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(not_found))
}
