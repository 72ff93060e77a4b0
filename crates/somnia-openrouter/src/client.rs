// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenRouter chat completions API.
//!
//! Provides [`OpenRouterClient`] which handles request construction,
//! authentication, and transient error retry.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use somnia_core::SomniaError;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

/// Base URL for the OpenRouter chat completions API.
const API_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// HTTP client for OpenRouter API communication.
///
/// Manages authentication headers, connection pooling, and retry logic for
/// transient errors (408, 429, 5xx).
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    max_retries: u32,
    base_url: String,
}

impl OpenRouterClient {
    /// Creates a new OpenRouter API client.
    ///
    /// `base_url` overrides the production endpoint, primarily for tests.
    pub fn new(api_key: &str, base_url: Option<String>) -> Result<Self, SomniaError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {api_key}");
        headers.insert(
            "authorization",
            HeaderValue::from_str(&auth)
                .map_err(|e| SomniaError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SomniaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            max_retries: 1,
            base_url: base_url.unwrap_or_else(|| API_BASE_URL.to_string()),
        })
    }

    /// Sends a completion request and returns the parsed response.
    ///
    /// On transient errors, retries once after a 1-second delay.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, SomniaError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(request)
                .send()
                .await
                .map_err(|e| SomniaError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| SomniaError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                let parsed: ChatResponse =
                    serde_json::from_str(&body).map_err(|e| SomniaError::Provider {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(parsed);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(SomniaError::provider(format!(
                    "API returned {status}: {body}"
                )));
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!("OpenRouter API error: {}", api_err.error.message)
            } else {
                format!("API returned {status}: {body}")
            };
            return Err(SomniaError::provider(message));
        }

        Err(last_error
            .unwrap_or_else(|| SomniaError::provider("completion request failed after retries")))
    }
}

/// Returns true for HTTP status codes worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> OpenRouterClient {
        OpenRouterClient::new("test-api-key", Some(server.uri())).unwrap()
    }

    fn test_request() -> ChatRequest {
        ChatRequest {
            model: "anthropic/claude-sonnet-4".into(),
            messages: vec![ChatMessage::user("Hello")],
            max_tokens: Some(128),
            modalities: None,
        }
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "gen-1",
            "model": "anthropic/claude-sonnet-4",
            "choices": [{
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7}
        })
    }

    #[tokio::test]
    async fn complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hi there!")))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let resp = client.complete(&test_request()).await.unwrap();
        assert_eq!(resp.id, "gen-1");
        assert_eq!(resp.usage.prompt_tokens, 12);
        assert_eq!(
            crate::types::text_of(&resp.choices[0].message.content),
            "Hi there!"
        );
    }

    #[tokio::test]
    async fn complete_retries_on_429() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"code": 429, "message": "Rate limited"}
        });

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(429).set_body_json(&error_body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("After retry")))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let resp = client.complete(&test_request()).await.unwrap();
        assert_eq!(
            crate::types::text_of(&resp.choices[0].message.content),
            "After retry"
        );
    }

    #[tokio::test]
    async fn complete_fails_on_400_without_retry() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"code": 400, "message": "Bad model"}
        });
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.complete(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("Bad model"), "got: {err}");
    }

    #[tokio::test]
    async fn complete_exhausts_retries_on_503() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"code": 503, "message": "Overloaded"}
        });
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_json(&error_body))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.complete(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("Overloaded"), "got: {err}");
    }

    #[tokio::test]
    async fn client_sends_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("ok")))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let result = client.complete(&test_request()).await;
        assert!(result.is_ok(), "headers should match: {result:?}");
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.complete(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("parse"), "got: {err}");
    }
}
