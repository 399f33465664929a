//! Caption service
//!
//! Turns an image payload into a `(music title, description)` pair with a
//! single completion request against an OpenAI-compatible multimodal model.
//!
//! The model is instructed to answer on one line as
//! `<song title> / <description>`; the slash is the delimiter this
//! implementation commits to. Parsing splits on the first slash, so titles
//! never contain one but descriptions may.
//!
//! # Failure policy
//!
//! Any transport error, non-success status, or malformed completion is
//! converted into the sentinel pair (`music_title = "Error"`, description =
//! short cause). `describe` never returns an error; downstream logic keys
//! off the sentinel. One attempt per submission, no retry, no caching.

use async_trait::async_trait;
use paintify_common::config::CaptionSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = "Paintify/0.1.0 (+https://github.com/paintify/paintify)";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_CAUSE_LEN: usize = 200;

/// Sentinel title marking a failed caption
pub const CAPTION_FAILURE_TITLE: &str = "Error";

/// Fixed instruction prompt sent with every image
const CAPTION_PROMPT: &str = "Look at this drawing. Answer on a single line with the title of an \
existing song that matches its mood, then a slash, then one short sentence describing the \
drawing. Use exactly the format: <song title> / <description>. Answer with nothing else.";

/// Result of a caption request. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caption {
    pub music_title: String,
    pub description: String,
}

impl Caption {
    /// Sentinel pair signaling failure to downstream logic
    pub fn failure(cause: impl Into<String>) -> Self {
        Self {
            music_title: CAPTION_FAILURE_TITLE.to_string(),
            description: cause.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.music_title == CAPTION_FAILURE_TITLE
    }
}

/// Seam for the generative model dependency (stubbed in tests)
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Produce a caption for an image payload. Infallible by signature;
    /// failures come back as the sentinel pair.
    async fn describe(&self, payload: &str) -> Caption;
}

/// Caption provider errors (internal; collapsed into the sentinel)
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiCaptionClient {
    http_client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiCaptionClient {
    pub fn new(settings: &CaptionSettings) -> Result<Self, CaptionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CaptionError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    async fn request_caption(&self, payload: &str) -> Result<Caption, CaptionError> {
        let url = format!("{}/chat/completions", self.api_base);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 120,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": CAPTION_PROMPT },
                    { "type": "image_url", "image_url": { "url": payload } }
                ]
            }]
        });

        debug!(model = %self.model, "Requesting caption from provider");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CaptionError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CaptionError::ApiError(
                status.as_u16(),
                extract_provider_error(&error_text),
            ));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CaptionError::MalformedResponse(e.to_string()))?;

        let content = completion
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| {
                CaptionError::MalformedResponse("completion has no content".to_string())
            })?;

        let (music_title, description) = parse_completion(content).ok_or_else(|| {
            CaptionError::MalformedResponse(format!("missing title/description delimiter: {}", content))
        })?;

        debug!(title = %music_title, "Caption received");

        Ok(Caption {
            music_title,
            description,
        })
    }
}

#[async_trait]
impl CaptionService for OpenAiCaptionClient {
    async fn describe(&self, payload: &str) -> Caption {
        match self.request_caption(payload).await {
            Ok(caption) => caption,
            Err(e) => {
                warn!("Caption request failed: {}", e);
                Caption::failure(short_cause(&e))
            }
        }
    }
}

/// Split a completion into `(title, description)` on the first slash
fn parse_completion(content: &str) -> Option<(String, String)> {
    let mut parts = content.splitn(2, '/');
    let title = parts.next()?.trim();
    let description = parts.next()?.trim();

    if title.is_empty() || description.is_empty() {
        return None;
    }

    Some((title.to_string(), description.to_string()))
}

/// Pull the human-readable message out of a provider error body, falling
/// back to the raw text
fn extract_provider_error(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    truncate_cause(&message)
}

/// Short, user-visible cause for the sentinel description
fn short_cause(error: &CaptionError) -> String {
    match error {
        CaptionError::ApiError(_, message) => truncate_cause(message),
        other => truncate_cause(&other.to_string()),
    }
}

fn truncate_cause(message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        return "unknown provider error".to_string();
    }
    match message.char_indices().nth(MAX_CAUSE_LEN) {
        Some((idx, _)) => format!("{}…", &message[..idx]),
        None => message.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_basic() {
        let (title, description) = parse_completion("Yellow Submarine / A boat on a sunny sea").unwrap();
        assert_eq!(title, "Yellow Submarine");
        assert_eq!(description, "A boat on a sunny sea");
    }

    #[test]
    fn test_parse_completion_description_keeps_later_slashes() {
        let (title, description) = parse_completion("Help! / Figures running / hiding").unwrap();
        assert_eq!(title, "Help!");
        assert_eq!(description, "Figures running / hiding");
    }

    #[test]
    fn test_parse_completion_missing_delimiter() {
        assert!(parse_completion("Just a description with no title").is_none());
        assert!(parse_completion("Title only /   ").is_none());
        assert!(parse_completion("   / description only").is_none());
        assert!(parse_completion("").is_none());
    }

    #[test]
    fn test_failure_sentinel() {
        let caption = Caption::failure("provider timed out");
        assert!(caption.is_failure());
        assert_eq!(caption.music_title, "Error");
        assert_eq!(caption.description, "provider timed out");

        let ok = Caption {
            music_title: "Yesterday".to_string(),
            description: "a gray day".to_string(),
        };
        assert!(!ok.is_failure());
    }

    #[test]
    fn test_extract_provider_error_json() {
        let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;
        assert_eq!(extract_provider_error(body), "Invalid API key");
    }

    #[test]
    fn test_extract_provider_error_plain_text() {
        assert_eq!(extract_provider_error("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_short_cause_truncates() {
        let long = "x".repeat(500);
        let cause = short_cause(&CaptionError::ApiError(500, long));
        assert!(cause.chars().count() <= MAX_CAUSE_LEN + 1);
        assert!(cause.ends_with('…'));
    }

    #[test]
    fn test_chat_response_parsing() {
        let json = r#"{
            "id": "chatcmpl-123",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Hey Jude / A sad face" },
                "finish_reason": "stop"
            }]
        }"#;

        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Hey Jude / A sad face")
        );
    }
}
