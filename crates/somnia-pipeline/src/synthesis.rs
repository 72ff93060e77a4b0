// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-dream synthesis engine.
//!
//! Scheduled unconditionally after every dream save; the minimum-entry
//! precondition is checked here, so repeated no-op invocations are the
//! accepted cost of keeping the save path simple. The stored synthesis is
//! overwritten in place -- concurrent runs both execute and the later
//! write wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use somnia_config::SomniaConfig;
use somnia_core::types::{PatchOutcome, ProviderMessage, ProviderRequest};
use somnia_core::{ProviderAdapter, SomniaError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::analysis::extract_json;
use crate::now_ms;

/// System prompt fixing the synthesis output shape.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = "\
You are Lumi, a gentle dream interpreter looking across a dreamer's recent \
journal. Given their recent entries, describe the psychological trajectory \
you see. Reply with a single JSON object, no prose around it:\n\
  \"synthesis\": 3-5 sentences tracing the arc across the dreams\n\
  \"dominant_archetype\": the figure or role most present across them\n\
  \"guidance\": one gentle suggestion for the dreamer's waking life";

/// A parsed synthesis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    pub synthesis: String,
    pub dominant_archetype: String,
    pub guidance: String,
}

/// Per-entry projection fed to the model.
#[derive(Debug, Serialize)]
struct EntryDigest {
    date: String,
    text: String,
    sentiment: String,
}

/// Truncate to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Generates and persists holistic narratives over recent entries.
pub struct SynthesisEngine {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    min_entries: i64,
    window: i64,
    truncate: usize,
}

impl SynthesisEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        config: &SomniaConfig,
    ) -> Self {
        Self {
            storage,
            provider,
            model: config.openrouter.synthesis_model.clone(),
            max_tokens: config.openrouter.max_tokens,
            min_entries: config.synthesis.min_entries,
            window: config.synthesis.window,
            truncate: config.synthesis.truncate_chars,
        }
    }

    /// Run one synthesis for a user.
    ///
    /// Returns `Ok(None)` when the precondition fails or the provider/parse
    /// step does -- failures are logged, never surfaced as errors, and the
    /// stored synthesis is left untouched. Storage errors still propagate
    /// so the queue can retry.
    pub async fn execute(&self, user_id: &str) -> Result<Option<Synthesis>, SomniaError> {
        let count = self.storage.count_dreams(user_id).await?;
        if count < self.min_entries {
            debug!(user_id, count, "synthesis skipped: not enough entries");
            return Ok(None);
        }

        let entries = self.storage.list_recent_dreams(user_id, self.window).await?;
        let digest: Vec<EntryDigest> = entries
            .iter()
            .map(|entry| EntryDigest {
                date: format_date(entry.created_at),
                text: truncate_chars(&entry.text, self.truncate),
                sentiment: entry.sentiment.clone().unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect();
        let user_content = serde_json::to_string(&digest)
            .map_err(|e| SomniaError::Internal(format!("digest encode: {e}")))?;

        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(SYNTHESIS_SYSTEM_PROMPT.to_string()),
            messages: vec![ProviderMessage {
                role: "user".to_string(),
                content: user_content,
            }],
            max_tokens: self.max_tokens,
        };

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(user_id, error = %e, "synthesis call failed");
                return Ok(None);
            }
        };

        let Some(parsed) = parse_synthesis(&response.content) else {
            warn!(user_id, "unusable synthesis reply");
            return Ok(None);
        };

        let raw_json = serde_json::to_string(&parsed)
            .map_err(|e| SomniaError::Internal(format!("synthesis encode: {e}")))?;
        match self.storage.patch_synthesis(user_id, &raw_json, now_ms()).await? {
            PatchOutcome::NotFound => {
                warn!(user_id, "synthesis target user not found");
                Ok(None)
            }
            _ => {
                info!(user_id, entries = digest.len(), "synthesis stored");
                Ok(Some(parsed))
            }
        }
    }
}

fn parse_synthesis(content: &str) -> Option<Synthesis> {
    let json = extract_json(content);
    if json.is_empty() {
        return None;
    }
    serde_json::from_str(json).ok()
}

fn format_date(epoch_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_default()
}
