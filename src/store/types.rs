//! Types for conversation documents and their version history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ConversationId;

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// The human drafting the document.
    #[serde(rename = "user")]
    User,
    /// The generative model.
    #[serde(rename = "bot", alias = "model", alias = "assistant")]
    Model,
}

/// A single chat message kept with a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub sender: Sender,
    /// Message text.
    pub text: String,
    /// Client display hint (`display`, `document_context`, ...), stored verbatim.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Message {
    /// Create a message without a display hint.
    #[must_use]
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            kind: None,
        }
    }
}

/// Immutable snapshot of the document at one point of its history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// 1-based version number, unique within the conversation.
    pub version_number: u32,
    /// Markdown content.
    pub content: String,
    /// Free-form notes describing the change.
    pub notes: String,
    /// Identity of whoever saved this version.
    pub uploaded_by: String,
    /// When the version was saved.
    pub timestamp: DateTime<Utc>,
}

/// A titled thread of messages plus its document revision history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Store-assigned identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Chat history, oldest first.
    pub messages: Vec<Message>,
    /// Version history ordered by `version_number`.
    pub document_versions: Vec<DocumentVersion>,
    /// Identity of whoever last saved the conversation.
    pub uploaded_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Content of the highest-numbered version.
    #[must_use]
    pub fn latest_document(&self) -> Option<&str> {
        self.document_versions
            .iter()
            .max_by_key(|v| v.version_number)
            .map(|v| v.content.as_str())
    }
}

/// Listing entry for a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Store-assigned identifier.
    pub id: ConversationId,
    /// Display title.
    pub title: String,
    /// Identity of whoever last saved the conversation.
    pub uploaded_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Number of stored versions.
    pub version_count: u32,
    /// Highest version number.
    pub latest_version: u32,
}

/// Input for creating a conversation.
#[derive(Clone, Debug)]
pub struct NewConversation {
    /// Display title.
    pub title: String,
    /// Chat history.
    pub messages: Vec<Message>,
    /// Content of version 1. Stored as an empty string when absent.
    pub initial_content: Option<String>,
    /// Identity of the uploader.
    pub uploaded_by: String,
    /// Notes for version 1.
    pub notes: String,
}

/// Input for updating a conversation; always appends a version.
#[derive(Clone, Debug)]
pub struct ConversationUpdate {
    /// New display title.
    pub title: String,
    /// Replacement chat history.
    pub messages: Vec<Message>,
    /// Content of the new version. The latest content is carried forward when absent.
    pub new_content: Option<String>,
    /// Identity of the uploader.
    pub uploaded_by: String,
    /// Notes for the new version.
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_accepts_aliases() {
        let bot: Sender = serde_json::from_str("\"bot\"").unwrap();
        let model: Sender = serde_json::from_str("\"model\"").unwrap();
        let assistant: Sender = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(bot, Sender::Model);
        assert_eq!(model, Sender::Model);
        assert_eq!(assistant, Sender::Model);
        assert!(serde_json::from_str::<Sender>("\"system\"").is_err());
    }

    #[test]
    fn test_message_keeps_display_hint() {
        let json = r##"{"sender":"bot","type":"document_context","text":"# Lease"}"##;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.kind.as_deref(), Some("document_context"));

        let out = serde_json::to_value(&message).unwrap();
        assert_eq!(out["type"], "document_context");
        assert_eq!(out["sender"], "bot");

        let plain = serde_json::to_value(Message::new(Sender::User, "hi")).unwrap();
        assert!(plain.get("type").is_none());
    }
}
