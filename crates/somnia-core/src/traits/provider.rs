// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for text LLM integrations.

use async_trait::async_trait;

use crate::error::SomniaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for text LLM provider integrations.
///
/// The analysis task and synthesis engine are the only consumers; both
/// issue single-shot completions and parse JSON out of the reply text.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SomniaError>;
}
