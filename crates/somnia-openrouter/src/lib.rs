// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenRouter provider adapters for the Somnia dream journal backend.
//!
//! Two adapters share one HTTP client: [`OpenRouterProvider`] implements
//! [`ProviderAdapter`] for analysis/synthesis text completions, and
//! [`OpenRouterImages`] implements [`ImageAdapter`] for multimodal image
//! generation.
//!
//! API key resolution order: config -> `OPENROUTER_API_KEY` env var -> error.

pub mod client;
pub mod types;

use async_trait::async_trait;
use tracing::info;

use somnia_config::SomniaConfig;
use somnia_core::error::SomniaError;
use somnia_core::traits::{ImageAdapter, PluginAdapter, ProviderAdapter};
use somnia_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage,
};

use crate::client::OpenRouterClient;
use crate::types::{ChatMessage, ChatRequest, text_of};

/// Resolve the API key from config or the `OPENROUTER_API_KEY` env var.
fn resolve_api_key(configured: &Option<String>) -> Result<String, SomniaError> {
    if let Some(key) = configured
        && !key.trim().is_empty()
    {
        return Ok(key.clone());
    }
    std::env::var("OPENROUTER_API_KEY").map_err(|_| {
        SomniaError::Config(
            "no OpenRouter API key: set openrouter.api_key or OPENROUTER_API_KEY".into(),
        )
    })
}

/// Text completion provider implementing [`ProviderAdapter`].
pub struct OpenRouterProvider {
    client: OpenRouterClient,
}

impl OpenRouterProvider {
    /// Creates a new provider from the given configuration.
    pub fn new(config: &SomniaConfig) -> Result<Self, SomniaError> {
        let api_key = resolve_api_key(&config.openrouter.api_key)?;
        let client = OpenRouterClient::new(&api_key, config.openrouter.base_url.clone())?;
        info!(
            analysis_model = config.openrouter.analysis_model,
            synthesis_model = config.openrouter.synthesis_model,
            "OpenRouter provider initialized"
        );
        Ok(Self { client })
    }

    /// Creates a provider with an existing client (for testing).
    pub fn with_client(client: OpenRouterClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PluginAdapter for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SomniaError> {
        // Stateless HTTP client; reachability is only proven by real calls.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SomniaError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenRouterProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SomniaError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        for m in &request.messages {
            messages.push(ChatMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            });
        }

        let chat_request = ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: Some(request.max_tokens),
            modalities: None,
        };

        let response = self.client.complete(&chat_request).await?;
        let choice = response
            .choices
            .first()
            .ok_or_else(|| SomniaError::provider("completion response had no choices"))?;

        Ok(ProviderResponse {
            id: response.id.clone(),
            content: text_of(&choice.message.content),
            model: response.model.clone(),
            stop_reason: choice.finish_reason.clone(),
            usage: TokenUsage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }
}

/// Image generation adapter implementing [`ImageAdapter`].
pub struct OpenRouterImages {
    client: OpenRouterClient,
    max_tokens: u32,
}

impl OpenRouterImages {
    /// Creates a new image adapter from the given configuration.
    pub fn new(config: &SomniaConfig) -> Result<Self, SomniaError> {
        let api_key = resolve_api_key(&config.openrouter.api_key)?;
        let client = OpenRouterClient::new(&api_key, config.openrouter.base_url.clone())?;
        info!(
            image_model = config.openrouter.image_model,
            "OpenRouter image adapter initialized"
        );
        Ok(Self {
            client,
            max_tokens: config.openrouter.max_tokens,
        })
    }

    /// Creates an adapter with an existing client (for testing).
    pub fn with_client(client: OpenRouterClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }
}

#[async_trait]
impl PluginAdapter for OpenRouterImages {
    fn name(&self) -> &str {
        "openrouter-images"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Image
    }

    async fn health_check(&self) -> Result<HealthStatus, SomniaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SomniaError> {
        Ok(())
    }
}

#[async_trait]
impl ImageAdapter for OpenRouterImages {
    async fn generate(&self, model: &str, prompt: &str) -> Result<serde_json::Value, SomniaError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: Some(self.max_tokens),
            modalities: Some(vec!["image".to_string(), "text".to_string()]),
        };

        let response = self.client.complete(&request).await?;
        let choice = response
            .choices
            .first()
            .ok_or_else(|| SomniaError::provider("image response had no choices"))?;

        // Prefer inline content; fall back to the out-of-band images field
        // when the model replies image-only.
        if !choice.message.content.is_null() {
            Ok(choice.message.content.clone())
        } else if let Some(images) = &choice.message.images {
            Ok(images.clone())
        } else {
            Ok(serde_json::Value::Null)
        }
    }
}
