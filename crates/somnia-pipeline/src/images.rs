// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image pipeline and retry controller.
//!
//! Per-entry state machine `pending -> generating -> completed | failed`.
//! Every attempt (first or retry) increments the retry counter and stamps
//! the attempt time via the `generating` transition, regardless of outcome.
//! A periodic sweep resubmits failed entries until the retry cap; entries
//! at the cap stay terminally failed.

use std::sync::Arc;

use somnia_config::SomniaConfig;
use somnia_core::types::{ImageStatus, PatchOutcome};
use somnia_core::{ImageAdapter, SomniaError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::now_ms;
use crate::synthesis::truncate_chars;

/// Style prefix of the image prompt; the dream text is appended, truncated.
const IMAGE_PROMPT_PREFIX: &str = "\
A dreamlike illustration, soft focus, muted nocturnal palette, gentle \
surrealism, no text. The scene: ";

/// Build the generation prompt, embedding at most `max_chars` of dream text.
pub fn build_image_prompt(text: &str, max_chars: usize) -> String {
    format!("{IMAGE_PROMPT_PREFIX}{}", truncate_chars(text.trim(), max_chars))
}

/// Pull an image reference out of a reply, trying all shapes the upstream
/// models are known to produce: a plain string, an array of content parts,
/// or a nested `image_url.url` object.
pub fn extract_image_reference(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Object(_) => nested_url(value),
        serde_json::Value::Array(parts) => parts.iter().find_map(|part| match part {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => nested_url(part),
        }),
        _ => None,
    }
}

fn nested_url(part: &serde_json::Value) -> Option<String> {
    part.get("image_url")
        .and_then(|iu| iu.get("url"))
        .or_else(|| part.get("url"))
        .and_then(|u| u.as_str())
        .filter(|u| !u.trim().is_empty())
        .map(|u| u.trim().to_string())
}

/// Outcome of one image generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Completed,
    Failed,
    /// Nothing to do: already completed, terminally failed, or unusable input.
    Skipped,
    NotFound,
}

/// Drives image generation attempts and the failed-image retry sweep.
pub struct ImagePipeline {
    storage: Arc<dyn StorageAdapter>,
    images: Arc<dyn ImageAdapter>,
    model: String,
    max_retries: i64,
    prompt_max_chars: usize,
}

impl ImagePipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        images: Arc<dyn ImageAdapter>,
        config: &SomniaConfig,
    ) -> Self {
        Self {
            storage,
            images,
            model: config.openrouter.image_model.clone(),
            max_retries: config.images.max_retries,
            prompt_max_chars: config.images.prompt_max_chars,
        }
    }

    /// Attempt generation for one entry.
    pub async fn generate(&self, dream_id: &str) -> Result<ImageOutcome, SomniaError> {
        let Some(dream) = self.storage.get_dream(dream_id).await? else {
            debug!(dream_id, "image target deleted before run");
            return Ok(ImageOutcome::NotFound);
        };

        if dream.image_status == ImageStatus::Completed {
            debug!(dream_id, "image already completed, skipping");
            return Ok(ImageOutcome::Skipped);
        }
        if dream.image_retry_count >= self.max_retries {
            debug!(dream_id, "retry cap reached, leaving entry terminally failed");
            return Ok(ImageOutcome::Skipped);
        }
        if dream.text.trim().is_empty() {
            debug!(dream_id, "no text to illustrate, failing without an attempt");
            self.storage.fail_image(dream_id).await?;
            return Ok(ImageOutcome::Skipped);
        }

        if self.storage.mark_image_generating(dream_id, now_ms()).await?
            == PatchOutcome::NotFound
        {
            return Ok(ImageOutcome::NotFound);
        }

        let prompt = build_image_prompt(&dream.text, self.prompt_max_chars);
        let reference = match self.images.generate(&self.model, &prompt).await {
            Ok(value) => extract_image_reference(&value),
            Err(e) => {
                warn!(dream_id, error = %e, "image generation call failed");
                None
            }
        };

        match reference {
            Some(url) => {
                self.storage.complete_image(dream_id, &url).await?;
                info!(dream_id, "image generated");
                Ok(ImageOutcome::Completed)
            }
            None => {
                self.storage.fail_image(dream_id).await?;
                warn!(dream_id, "no image reference in reply, marked failed");
                Ok(ImageOutcome::Failed)
            }
        }
    }

    /// One pass of the periodic retry sweep: resubmit every failed entry
    /// that still has retry budget and text. Returns how many were attempted.
    pub async fn sweep(&self) -> Result<usize, SomniaError> {
        let retryable = self.storage.list_retryable_images(self.max_retries).await?;
        let total = retryable.len();
        if total == 0 {
            return Ok(0);
        }
        info!(count = total, "retrying failed image generations");
        for dream in retryable {
            self.generate(&dream.id).await?;
        }
        Ok(total)
    }
}
