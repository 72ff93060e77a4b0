// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asynchronous dream analysis task.
//!
//! Consumes an analysis job, calls the LLM with the fixed analysis prompt,
//! normalizes the reply through the taxonomy and entity registry, and
//! patches the dream row under its revision guard. Provider failures and
//! malformed replies resolve to a canned fallback interpretation -- the
//! save caller returned long ago and never sees them.

use std::sync::Arc;

use serde::Deserialize;
use somnia_config::SomniaConfig;
use somnia_core::types::{AnalysisPatch, EntityKind, EntityRef, PatchOutcome, ProviderMessage, ProviderRequest};
use somnia_core::{ProviderAdapter, SomniaError, StorageAdapter};
use tracing::{debug, warn};

use crate::registry::{EntityMention, EntityRegistry};
use crate::taxonomy::normalize_sentiment;
use crate::worker::AnalysisJob;

/// System prompt fixing the analysis output shape.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are Lumi, a gentle dream interpreter. Analyze the user's dream and reply \
with a single JSON object, no prose around it, with these fields:\n\
  \"interpretation\": a warm 2-4 sentence reading of the dream\n\
  \"sentiment\": the single dominant feeling, one or two words\n\
  \"secondary_sentiments\": up to three further feelings (array of strings)\n\
  \"symbols\": array of {\"name\", \"context\"} for striking images or objects\n\
  \"archetypes\": array of {\"name\", \"context\"} for figures or roles\n\
  \"emotions\": array of {\"name\", \"context\"} for feelings within the dream\n\
  \"lumi_quote\": one short encouraging line in Lumi's voice\n\
  \"guidance\": one gentle suggestion for reflection";

/// Canned interpretation applied when the provider fails or replies with
/// something unusable.
pub const FALLBACK_INTERPRETATION: &str = "\
This dream holds meaning that resists quick interpretation. Sit with its \
images for a moment -- what felt most vivid often matters most. You can ask \
for a fresh reading any time.";

/// Entity occurrence as emitted by the model.
#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    context: String,
}

/// Lenient shape of the analysis reply. Missing arrays are empty; missing
/// strings are handled downstream.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    interpretation: Option<String>,
    sentiment: Option<String>,
    #[serde(default)]
    secondary_sentiments: Vec<String>,
    #[serde(default)]
    symbols: Vec<RawEntity>,
    #[serde(default)]
    archetypes: Vec<RawEntity>,
    #[serde(default)]
    emotions: Vec<RawEntity>,
    lumi_quote: Option<String>,
    guidance: Option<String>,
}

/// Strip a surrounding markdown code fence, if any.
pub(crate) fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(str::trim_start);
    match inner {
        Some(rest) => rest.strip_suffix("```").map(str::trim).unwrap_or(rest.trim()),
        None => trimmed,
    }
}

fn parse_analysis(content: &str) -> Option<RawAnalysis> {
    let json = extract_json(content);
    if json.is_empty() {
        return None;
    }
    serde_json::from_str(json).ok()
}

/// Outcome of one analysis job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The model's analysis was applied.
    Applied,
    /// The provider failed or replied unusably; the canned fallback was applied.
    FallbackApplied,
    /// The dream was deleted before the job ran.
    DreamNotFound,
    /// The dream was edited after the job was scheduled; patch discarded.
    Stale,
}

/// Executes analysis jobs from the durable queue.
pub struct AnalysisTask {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn ProviderAdapter>,
    registry: EntityRegistry,
    model: String,
    max_tokens: u32,
}

impl AnalysisTask {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn ProviderAdapter>,
        config: &SomniaConfig,
    ) -> Self {
        let registry = EntityRegistry::new(storage.clone());
        Self {
            storage,
            provider,
            registry,
            model: config.openrouter.analysis_model.clone(),
            max_tokens: config.openrouter.max_tokens,
        }
    }

    /// Run one analysis job to completion.
    ///
    /// Storage errors propagate (the queue retries); provider and parse
    /// failures do not -- they settle as the fallback interpretation.
    pub async fn execute(&self, job: &AnalysisJob) -> Result<AnalysisOutcome, SomniaError> {
        let Some(dream) = self.storage.get_dream(&job.dream_id).await? else {
            debug!(dream_id = %job.dream_id, "analysis target deleted before run");
            return Ok(AnalysisOutcome::DreamNotFound);
        };
        if dream.revision != job.revision {
            debug!(dream_id = %job.dream_id, "analysis target edited before run");
            return Ok(AnalysisOutcome::Stale);
        }

        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: Some(ANALYSIS_SYSTEM_PROMPT.to_string()),
            messages: vec![ProviderMessage {
                role: "user".to_string(),
                content: dream.text.clone(),
            }],
            max_tokens: self.max_tokens,
        };

        let (patch, fallback) = match self.provider.complete(request).await {
            Ok(response) => match parse_analysis(&response.content) {
                Some(raw) => (self.build_patch(raw).await?, false),
                None => {
                    warn!(dream_id = %job.dream_id, "unusable analysis reply, applying fallback");
                    (fallback_patch(), true)
                }
            },
            Err(e) => {
                warn!(dream_id = %job.dream_id, error = %e, "analysis call failed, applying fallback");
                (fallback_patch(), true)
            }
        };

        let outcome = self
            .storage
            .apply_analysis(&job.dream_id, job.revision, &patch)
            .await?;
        Ok(match outcome {
            PatchOutcome::Applied if fallback => AnalysisOutcome::FallbackApplied,
            PatchOutcome::Applied => AnalysisOutcome::Applied,
            PatchOutcome::NotFound => AnalysisOutcome::DreamNotFound,
            PatchOutcome::Stale => AnalysisOutcome::Stale,
        })
    }

    /// Normalize the raw reply into a patch, registering entities along the
    /// way. The three registry calls are sequential and independent.
    async fn build_patch(&self, raw: RawAnalysis) -> Result<AnalysisPatch, SomniaError> {
        let symbols = self.register(EntityKind::Symbol, raw.symbols).await?;
        let archetypes = self.register(EntityKind::Archetype, raw.archetypes).await?;
        let emotions = self.register(EntityKind::Emotion, raw.emotions).await?;

        let sentiment = normalize_sentiment(raw.sentiment.as_deref().unwrap_or_default());
        let secondary = raw
            .secondary_sentiments
            .iter()
            .map(|s| normalize_sentiment(s).to_string())
            .collect();

        Ok(AnalysisPatch {
            interpretation: raw
                .interpretation
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_INTERPRETATION.to_string()),
            sentiment: Some(sentiment.to_string()),
            secondary_sentiments: secondary,
            symbols,
            archetypes,
            emotions,
            lumi_quote: raw.lumi_quote,
            guidance: raw.guidance,
        })
    }

    async fn register(
        &self,
        kind: EntityKind,
        raw: Vec<RawEntity>,
    ) -> Result<Vec<EntityRef>, SomniaError> {
        let mentions: Vec<EntityMention> = raw
            .into_iter()
            .map(|e| EntityMention::new(e.name, e.context))
            .collect();
        self.registry.upsert_many(kind, &mentions).await
    }
}

/// The inert patch applied when the external dependency failed.
fn fallback_patch() -> AnalysisPatch {
    AnalysisPatch {
        interpretation: FALLBACK_INTERPRETATION.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use somnia_config::model::StorageConfig;
    use somnia_core::types::UserProfile;
    use somnia_storage::SqliteStorage;
    use somnia_test_utils::MockProvider;
    use tempfile::tempdir;

    use crate::journal::DreamJournal;
    use crate::worker::ANALYSIS_QUEUE;

    fn analysis_reply() -> String {
        serde_json::json!({
            "interpretation": "Flight speaks to a longing for space of your own.",
            "sentiment": "freedom",
            "secondary_sentiments": ["wonder", "definitely not a real feeling"],
            "symbols": [
                {"name": "Mountains", "context": "jagged peaks far below"},
                {"name": "Sky", "context": "an open violet sky"}
            ],
            "archetypes": [{"name": "The Explorer", "context": "you, unafraid"}],
            "emotions": [{"name": "Awe", "context": "looking down at the world"}],
            "lumi_quote": "Wings suit you.",
            "guidance": "Notice where waking life feels weightless."
        })
        .to_string()
    }

    async fn setup(
        responses: Vec<String>,
    ) -> (AnalysisTask, DreamJournal, Arc<SqliteStorage>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = somnia_config::SomniaConfig::default();
        let storage_config = StorageConfig {
            database_path: dir.path().join("test.db").display().to_string(),
        };
        let storage = Arc::new(SqliteStorage::new(storage_config));
        storage.initialize().await.unwrap();
        let provider = Arc::new(MockProvider::with_responses(responses));
        let task = AnalysisTask::new(storage.clone(), provider, &config);
        let journal = DreamJournal::new(storage.clone());
        (task, journal, storage, dir)
    }

    async fn saved_job(journal: &DreamJournal, storage: &SqliteStorage) -> AnalysisJob {
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();
        let dream_id = journal.save("u1", "I was flying over mountains", None).await.unwrap();
        let entry = storage.dequeue(ANALYSIS_QUEUE).await.unwrap().unwrap();
        storage.ack(entry.id).await.unwrap();
        serde_json::from_str(&entry.payload).unwrap()
    }

    #[test]
    fn extract_json_handles_fences_and_plain_text() {
        assert_eq!(extract_json("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("   "), "");
    }

    #[tokio::test]
    async fn successful_analysis_patches_normalized_fields() {
        let (task, journal, storage, _dir) = setup(vec![analysis_reply()]).await;
        let job = saved_job(&journal, &storage).await;

        let outcome = task.execute(&job).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Applied);

        let dream = storage.get_dream(&job.dream_id).await.unwrap().unwrap();
        assert_eq!(dream.sentiment.as_deref(), Some("Freedom"));
        assert_eq!(
            dream.secondary_sentiments,
            vec!["Wonder".to_string(), "Mystery".to_string()],
            "unknown secondary sentiment collapses to the fallback"
        );
        assert_eq!(dream.symbols.len(), 2);
        assert_eq!(dream.symbols[0].name, "mountains");
        assert_eq!(dream.symbols[0].context, "jagged peaks far below");
        assert_eq!(dream.archetypes[0].name, "the explorer");
        assert_eq!(dream.lumi_quote.as_deref(), Some("Wings suit you."));

        // Catalog rows exist with counts.
        let item = storage
            .get_catalog_item_by_name(EntityKind::Symbol, "mountains")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.references, 1);
    }

    #[tokio::test]
    async fn provider_error_applies_fallback() {
        let (task, journal, storage, _dir) = setup(vec![]).await;
        let job = saved_job(&journal, &storage).await;

        // Empty mock queue -> provider error on next call.
        let outcome = task.execute(&job).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::FallbackApplied);

        let dream = storage.get_dream(&job.dream_id).await.unwrap().unwrap();
        assert_eq!(dream.interpretation.as_deref(), Some(FALLBACK_INTERPRETATION));
        assert!(dream.sentiment.is_none());
        assert!(dream.symbols.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_applies_fallback() {
        let (task, journal, storage, _dir) =
            setup(vec!["the dream means you are tired".to_string()]).await;
        let job = saved_job(&journal, &storage).await;

        let outcome = task.execute(&job).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::FallbackApplied);
    }

    #[tokio::test]
    async fn fenced_json_reply_is_accepted() {
        let fenced = format!("```json\n{}\n```", analysis_reply());
        let (task, journal, storage, _dir) = setup(vec![fenced]).await;
        let job = saved_job(&journal, &storage).await;

        let outcome = task.execute(&job).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Applied);
    }

    #[tokio::test]
    async fn missing_optional_arrays_default_to_empty() {
        let minimal = serde_json::json!({
            "interpretation": "A quiet dream.",
            "sentiment": "Peace"
        })
        .to_string();
        let (task, journal, storage, _dir) = setup(vec![minimal]).await;
        let job = saved_job(&journal, &storage).await;

        assert_eq!(task.execute(&job).await.unwrap(), AnalysisOutcome::Applied);
        let dream = storage.get_dream(&job.dream_id).await.unwrap().unwrap();
        assert!(dream.symbols.is_empty());
        assert!(dream.secondary_sentiments.is_empty());
        assert_eq!(dream.sentiment.as_deref(), Some("Peace"));
    }

    #[tokio::test]
    async fn edited_dream_discards_the_stale_patch() {
        let (task, journal, storage, _dir) = setup(vec![analysis_reply()]).await;
        let job = saved_job(&journal, &storage).await;

        journal.update_text(&job.dream_id, "something else entirely").await.unwrap();

        let outcome = task.execute(&job).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Stale);
        let dream = storage.get_dream(&job.dream_id).await.unwrap().unwrap();
        assert!(dream.interpretation.is_none());
    }

    #[tokio::test]
    async fn deleted_dream_is_a_quiet_not_found() {
        let (task, journal, storage, _dir) = setup(vec![analysis_reply()]).await;
        let job = saved_job(&journal, &storage).await;

        journal.delete(&job.dream_id).await.unwrap();
        let outcome = task.execute(&job).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::DreamNotFound);
    }
}
