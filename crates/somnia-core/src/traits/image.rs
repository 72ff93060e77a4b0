// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image adapter trait for multimodal image-generation models.

use async_trait::async_trait;

use crate::error::SomniaError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for image-generation model integrations.
///
/// Returns the assistant message content as raw JSON: depending on the
/// upstream model this is a plain string, an array of content parts, or a
/// nested `image_url.url` object. The image pipeline attempts all three
/// shapes before declaring failure.
#[async_trait]
pub trait ImageAdapter: PluginAdapter {
    /// Requests one illustrative image for the given prompt.
    async fn generate(&self, model: &str, prompt: &str) -> Result<serde_json::Value, SomniaError>;
}
