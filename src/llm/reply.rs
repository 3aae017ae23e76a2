//! Classification of free-form model replies.
//!
//! The model is instructed to wrap a finished document in a fenced block
//! opened by ```` ```json ```` and shaped `{"type": "document", "text": "..."}`.
//! Everything else is a clarifying question. Parsing rules, in order:
//!
//! 1. the first fenced `json` block is parsed;
//! 2. without a fence, a reply that is itself a JSON object is parsed;
//! 3. JSON with raw control characters inside string literals is repaired once;
//! 4. anything still unparsable, or lacking a non-empty `text`, falls back to
//!    a question carrying the whole reply.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Opening marker of a document block.
const JSON_FENCE: &str = "```json";

#[allow(clippy::unwrap_used)]
static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*(?:```|\z)").unwrap());

/// Classified model reply, serialized as `{"type": ..., "text": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatReply {
    /// A complete document in markdown.
    Document {
        /// Document markdown.
        text: String,
    },
    /// A follow-up question for the user.
    Question {
        /// Question text.
        text: String,
    },
}

impl ChatReply {
    /// Reply text, whichever the variant.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Document { text } | Self::Question { text } => text,
        }
    }
}

#[derive(Deserialize)]
struct TaggedBlock {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    text: Option<String>,
}

/// Classify a raw model reply.
#[must_use]
pub fn parse_reply(raw: &str) -> ChatReply {
    let candidate = if raw.contains(JSON_FENCE) {
        FENCED_JSON
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    } else {
        let trimmed = raw.trim();
        (trimmed.starts_with('{') && trimmed.ends_with('}')).then_some(trimmed)
    };

    let Some(candidate) = candidate else {
        return question(raw);
    };

    match decode_block(candidate) {
        Some(TaggedBlock {
            kind: Some(kind),
            text: Some(text),
        }) if kind.eq_ignore_ascii_case("question") && !text.trim().is_empty() => {
            ChatReply::Question { text }
        }
        Some(TaggedBlock {
            text: Some(text), ..
        }) if !text.trim().is_empty() => ChatReply::Document { text },
        Some(_) => {
            tracing::warn!("Document block has no text; treating reply as a question");
            question(raw)
        }
        None => {
            tracing::warn!("Malformed document block in model reply; treating it as a question");
            question(raw)
        }
    }
}

fn question(raw: &str) -> ChatReply {
    ChatReply::Question {
        text: raw.to_string(),
    }
}

fn decode_block(candidate: &str) -> Option<TaggedBlock> {
    serde_json::from_str(candidate)
        .or_else(|_| serde_json::from_str(&escape_control_chars_in_strings(candidate)))
        .ok()
}

/// Escape raw newlines, tabs and other control characters found inside JSON
/// string literals. Characters outside strings are left untouched.
fn escape_control_chars_in_strings(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }

    out
}
