// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the OpenAI-compatible chat completions API.
//!
//! Response message content is kept as raw JSON: text models reply with a
//! plain string, multimodal models with an array of parts or a nested
//! `image_url` object. Consumers pick the shape they need.

use serde::{Deserialize, Serialize};

/// A chat completions request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Requested output modalities; set for image generation calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
}

/// A single request message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat completions response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message of a choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    /// Plain string for text models; array of parts or nested object for
    /// multimodal models; null when the reply is image-only.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Some multimodal models return generated images out-of-band here.
    #[serde(default)]
    pub images: Option<serde_json::Value>,
}

/// Token usage block.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Error envelope returned by the API on failures.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

/// Collect the textual content of an assistant message.
///
/// A plain string is returned as-is; an array of parts contributes the
/// `text` field of each part. Anything else yields an empty string.
pub fn text_of(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_of_plain_string() {
        assert_eq!(text_of(&json!("hello")), "hello");
    }

    #[test]
    fn text_of_part_array_concatenates() {
        let content = json!([
            {"type": "text", "text": "first "},
            {"type": "image_url", "image_url": {"url": "https://x/y.png"}},
            {"type": "text", "text": "second"},
        ]);
        assert_eq!(text_of(&content), "first second");
    }

    #[test]
    fn text_of_null_is_empty() {
        assert_eq!(text_of(&serde_json::Value::Null), "");
    }

    #[test]
    fn response_parses_with_missing_optionals() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "hi"}}]
        });
        let resp: ChatResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(text_of(&resp.choices[0].message.content), "hi");
        assert_eq!(resp.usage.prompt_tokens, 0);
    }

    #[test]
    fn request_omits_absent_modalities() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("hi")],
            max_tokens: Some(10),
            modalities: None,
        };
        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("modalities").is_none());
    }
}
