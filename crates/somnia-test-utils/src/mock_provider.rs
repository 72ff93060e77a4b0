// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider for deterministic testing.
//!
//! `MockProvider` implements both `ProviderAdapter` and `ImageAdapter` with
//! pre-configured responses, enabling fast, CI-runnable tests without
//! external API calls. Responses pop from FIFO queues; an empty queue
//! produces a provider error, which is how tests simulate upstream failure.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use somnia_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};
use somnia_core::{ImageAdapter, PluginAdapter, ProviderAdapter, SomniaError};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    texts: Arc<Mutex<VecDeque<String>>>,
    images: Arc<Mutex<VecDeque<serde_json::Value>>>,
    calls: Arc<Mutex<u64>>,
}

impl MockProvider {
    /// Create a mock provider with empty response queues.
    pub fn new() -> Self {
        Self {
            texts: Arc::new(Mutex::new(VecDeque::new())),
            images: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a mock provider pre-loaded with text completions.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            texts: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Self::new()
        }
    }

    /// Create a mock provider pre-loaded with image replies.
    pub fn with_images(images: Vec<serde_json::Value>) -> Self {
        Self {
            images: Arc::new(Mutex::new(VecDeque::from(images))),
            ..Self::new()
        }
    }

    /// Queue another text completion.
    pub async fn push_response(&self, text: String) {
        self.texts.lock().await.push_back(text);
    }

    /// Queue another image reply.
    pub async fn push_image(&self, value: serde_json::Value) {
        self.images.lock().await.push_back(value);
    }

    /// Total completion and image calls made so far.
    pub async fn call_count(&self) -> u64 {
        *self.calls.lock().await
    }

    async fn record_call(&self) {
        *self.calls.lock().await += 1;
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SomniaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SomniaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SomniaError> {
        self.record_call().await;
        let Some(text) = self.texts.lock().await.pop_front() else {
            return Err(SomniaError::provider("mock provider: text queue empty"));
        };
        Ok(ProviderResponse {
            id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
            content: text,
            model: request.model,
            stop_reason: Some("stop".to_string()),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }
}

#[async_trait]
impl ImageAdapter for MockProvider {
    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
    ) -> Result<serde_json::Value, SomniaError> {
        self.record_call().await;
        self.images
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| SomniaError::provider("mock provider: image queue empty"))
    }
}
