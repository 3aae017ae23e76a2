//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::store::{Message, Sender};

use super::error::{LlmError, LlmResult};
use super::ChatModel;

/// System instruction for the legal drafting assistant.
const SYSTEM_INSTRUCTION: &str = r#"You are a helpful legal assistant. Your goal is to help the user create a legal document.
- First, ask follow-up questions to gather all the necessary details.
- When you have enough information, generate the full legal document in a JSON format like this: ```json{"type": "document", "text": "...your document here..."}```.
- If the user asks to update some information, you must regenerate the **entire** document with the updated information and provide the full document again in the same JSON format. Do not just provide the updated line or a confirmation message."#;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Async Gemini client.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a client from configuration.
    ///
    /// A missing API key is not an error here; requests fail with
    /// [`LlmError::MissingApiKey`] instead.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .gzip(true)
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// Full `generateContent` endpoint for the configured model.
    fn endpoint(&self) -> LlmResult<url::Url> {
        let base = url::Url::parse(&self.config.base_url)?;
        let model = self
            .config
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.config.model);
        Ok(base.join(&format!("v1beta/models/{model}:generateContent"))?)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    async fn generate(&self, history: &[Message]) -> LlmResult<String> {
        let api_key = self.api_key().ok_or(LlmError::MissingApiKey)?;

        let request = build_request(history);
        tracing::debug!(
            "Sending {} messages to {}",
            request.contents.len(),
            self.config.model
        );

        let response = self
            .client
            .post(self.endpoint()?)
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_text(body)
    }
}

/// Map the stored history onto Gemini turns.
fn build_request(history: &[Message]) -> GenerateContentRequest<'_> {
    let contents = history
        .iter()
        .map(|message| Content {
            role: match message.sender {
                Sender::User => "user",
                Sender::Model => "model",
            },
            parts: vec![Part {
                text: &message.text,
            }],
        })
        .collect();

    GenerateContentRequest {
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: SYSTEM_INSTRUCTION,
            }],
        },
        contents,
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: GenerateContentResponse) -> LlmResult<String> {
    let block_reason = body.prompt_feedback.and_then(|f| f.block_reason);
    let Some(candidate) = body.candidates.into_iter().next() else {
        return Err(LlmError::EmptyResponse(block_reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse(candidate.finish_reason));
    }
    Ok(text)
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_roles_and_instruction() {
        let history = vec![
            Message::new(Sender::User, "I need an NDA"),
            Message::new(Sender::Model, "Between whom?"),
        ];
        let value = serde_json::to_value(build_request(&history)).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "I need an NDA");
        assert_eq!(value["contents"][1]["role"], "model");
        assert!(
            value["systemInstruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .contains("legal assistant")
        );
    }

    #[test]
    fn test_endpoint_strips_models_prefix() {
        let config = GeminiConfig {
            model: "models/gemini-2.5-flash-lite".to_string(),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "Hello there");
    }

    #[test]
    fn test_blocked_prompt_is_an_error() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let err = extract_text(body).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse(Some(ref r)) if r == "SAFETY"));
        assert_eq!(err.to_string(), "model returned no content (SAFETY)");
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        assert!(!client.is_configured());
        let err = client
            .generate(&[Message::new(Sender::User, "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
