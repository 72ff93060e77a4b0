// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Somnia workspace.
//!
//! These are the canonical row shapes for persisted entities plus the
//! request/response types exchanged with LLM provider adapters. Storage
//! re-exports them; the pipeline crate operates on them directly.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One calendar day expressed in epoch milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Provider,
    Image,
    Storage,
}

/// The three taxonomies tracked by the entity catalog.
///
/// Each kind maps to its own structurally identical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Symbol,
    Archetype,
    Emotion,
}

impl EntityKind {
    /// Catalog table name for this kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Symbol => "symbols",
            EntityKind::Archetype => "archetypes",
            EntityKind::Emotion => "emotions",
        }
    }
}

/// Image generation state for a dream entry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    #[default]
    Pending,
    Generating,
    Completed,
    Failed,
}

/// A per-occurrence link from a dream entry to a catalog entity.
///
/// `context` is the only field that varies per dream even when the
/// entity itself is shared across users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub reference_id: String,
    pub name: String,
    pub context: String,
}

/// A single journaled dream record with its raw text and derived analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamEntry {
    pub id: String,
    pub user_id: String,
    /// Raw narration. May be an empty placeholder before analysis completes.
    pub text: String,
    pub interpretation: Option<String>,
    /// Canonical sentiment label, normalized at write time (not schema-enforced).
    pub sentiment: Option<String>,
    pub secondary_sentiments: Vec<String>,
    pub symbols: Vec<EntityRef>,
    pub archetypes: Vec<EntityRef>,
    pub emotions: Vec<EntityRef>,
    pub lumi_quote: Option<String>,
    pub guidance: Option<String>,
    pub image_url: Option<String>,
    pub image_status: ImageStatus,
    pub image_retry_count: i64,
    pub image_last_attempt: Option<i64>,
    /// Monotonic edit counter. Analysis patches scheduled against an older
    /// revision are discarded.
    pub revision: i64,
    /// The "dream night" in epoch millis -- caller-supplied, not necessarily
    /// the submission time.
    pub created_at: i64,
}

impl DreamEntry {
    /// Build a stub entry as inserted by the save path, before analysis.
    pub fn stub(id: String, user_id: String, text: String, created_at: i64) -> Self {
        Self {
            id,
            user_id,
            text,
            interpretation: None,
            sentiment: None,
            secondary_sentiments: Vec::new(),
            symbols: Vec::new(),
            archetypes: Vec::new(),
            emotions: Vec::new(),
            lumi_quote: None,
            guidance: None,
            image_url: None,
            image_status: ImageStatus::Pending,
            image_retry_count: 0,
            image_last_attempt: None,
            revision: 0,
            created_at,
        }
    }
}

/// A shared catalog row for a symbol, archetype, or emotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    /// Normalized name: trimmed, lower-cased, unique within the table.
    pub name: String,
    pub description: String,
    pub category: String,
    /// Lifetime "ever mentioned" count across all users. Never decremented,
    /// including on dream deletion.
    pub references: i64,
}

/// A user's denormalized gamification and profile state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// External auth identity.
    pub user_id: String,
    pub xp: i64,
    pub level: i64,
    pub streak: i64,
    pub last_entry_date: Option<i64>,
    pub dream_frequency: Option<String>,
    pub primary_goal: Option<String>,
    pub marketing_vibe: Option<String>,
    pub onboarding_status: OnboardingStatus,
    pub subscription_tier: Option<String>,
    pub subscription_plan: Option<String>,
    pub subscription_expiry: Option<i64>,
    pub customer_id: Option<String>,
    /// Raw JSON string of the most recent synthesis, overwritten in place.
    pub last_synthesis: Option<String>,
    pub last_synthesis_date: Option<i64>,
    /// Optimistic concurrency counter guarding gamification patches.
    pub version: i64,
    pub created_at: i64,
}

impl UserProfile {
    /// A fresh profile as created on first auth sync.
    pub fn new(user_id: String, created_at: i64) -> Self {
        Self {
            user_id,
            xp: 0,
            level: 1,
            streak: 0,
            last_entry_date: None,
            dream_frequency: None,
            primary_goal: None,
            marketing_vibe: None,
            onboarding_status: OnboardingStatus::InProgress,
            subscription_tier: None,
            subscription_plan: None,
            subscription_expiry: None,
            customer_id: None,
            last_synthesis: None,
            last_synthesis_date: None,
            version: 0,
            created_at,
        }
    }
}

/// Onboarding progress for a user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    #[default]
    InProgress,
    Completed,
}

/// Append-only audit row for a subscription purchase/restore/cancel event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub id: i64,
    pub user_id: String,
    pub event_type: String,
    /// Raw provider payload, if any.
    pub payload: Option<String>,
    pub created_at: i64,
}

/// Fields patched by the analysis task after a successful (or fallback) LLM run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPatch {
    pub interpretation: String,
    pub sentiment: Option<String>,
    pub secondary_sentiments: Vec<String>,
    pub symbols: Vec<EntityRef>,
    pub archetypes: Vec<EntityRef>,
    pub emotions: Vec<EntityRef>,
    pub lumi_quote: Option<String>,
    pub guidance: Option<String>,
}

/// Profile fields a user may edit directly.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub dream_frequency: Option<String>,
    pub primary_goal: Option<String>,
    pub marketing_vibe: Option<String>,
    pub onboarding_status: Option<OnboardingStatus>,
}

/// Subscription fields patched alongside each subscription event.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub tier: Option<String>,
    pub plan: Option<String>,
    pub expiry: Option<i64>,
    pub customer_id: Option<String>,
}

/// Outcome of a patch against a row that may have moved underneath us.
///
/// Missing targets and stale revisions are expected conditions of the
/// background-task model, not errors -- they are surfaced as values so the
/// worker can log them instead of silently dropping writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    NotFound,
    /// The target row was edited (revision/version advanced) after the
    /// patch was computed.
    Stale,
}

/// One entry of the durable background task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

// --- Provider types ---

/// A single chat message sent to an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: String,
    pub content: String,
}

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
}

/// A response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

/// Token counts reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
