// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::SomniaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AnalysisPatch, CatalogItem, DreamEntry, EntityKind, PatchOutcome, ProfilePatch, QueueEntry,
    SubscriptionEvent, SubscriptionPatch, UserProfile,
};

/// Adapter for storage and persistence backends.
///
/// Storage adapters manage connection lifecycle and provide the typed
/// operations the pipeline is built on: dream entries, user profiles,
/// the shared entity catalog, the subscription audit log, and the durable
/// background task queue.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connections).
    async fn initialize(&self) -> Result<(), SomniaError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), SomniaError>;

    // --- Dream entries ---

    async fn insert_dream(&self, entry: &DreamEntry) -> Result<(), SomniaError>;

    async fn get_dream(&self, id: &str) -> Result<Option<DreamEntry>, SomniaError>;

    /// All entries for a user, newest first.
    async fn list_dreams(&self, user_id: &str) -> Result<Vec<DreamEntry>, SomniaError>;

    /// The `limit` most recent entries for a user, newest first.
    async fn list_recent_dreams(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<DreamEntry>, SomniaError>;

    async fn count_dreams(&self, user_id: &str) -> Result<i64, SomniaError>;

    /// Distinct entry days (epoch-day buckets) for a user, descending.
    async fn list_entry_days(&self, user_id: &str) -> Result<Vec<i64>, SomniaError>;

    /// Patches the raw text and bumps the revision counter.
    async fn update_dream_text(&self, id: &str, text: &str) -> Result<PatchOutcome, SomniaError>;

    /// Applies an analysis patch iff the row exists and its revision still
    /// matches the revision captured when the job was scheduled.
    async fn apply_analysis(
        &self,
        id: &str,
        expected_revision: i64,
        patch: &AnalysisPatch,
    ) -> Result<PatchOutcome, SomniaError>;

    /// Hard delete. Catalog reference counts are not touched.
    async fn delete_dream(&self, id: &str) -> Result<PatchOutcome, SomniaError>;

    // --- Image pipeline ---

    /// Transition to `generating`, incrementing the retry count and stamping
    /// the attempt time. Applied for every attempt regardless of outcome.
    async fn mark_image_generating(
        &self,
        id: &str,
        attempted_at: i64,
    ) -> Result<PatchOutcome, SomniaError>;

    async fn complete_image(&self, id: &str, url: &str) -> Result<PatchOutcome, SomniaError>;

    async fn fail_image(&self, id: &str) -> Result<PatchOutcome, SomniaError>;

    /// Entries in `failed` state with a retry budget left and non-empty text.
    async fn list_retryable_images(
        &self,
        max_retries: i64,
    ) -> Result<Vec<DreamEntry>, SomniaError>;

    // --- Users ---

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, SomniaError>;

    async fn create_user(&self, profile: &UserProfile) -> Result<(), SomniaError>;

    async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> Result<PatchOutcome, SomniaError>;

    /// Version-guarded gamification patch. Returns `Stale` when the stored
    /// version no longer matches `expected_version` (concurrent save won).
    #[allow(clippy::too_many_arguments)]
    async fn patch_gamification(
        &self,
        user_id: &str,
        expected_version: i64,
        xp: i64,
        level: i64,
        streak: i64,
        last_entry_date: i64,
    ) -> Result<PatchOutcome, SomniaError>;

    /// Overwrites the stored synthesis (later write wins).
    async fn patch_synthesis(
        &self,
        user_id: &str,
        synthesis_json: &str,
        generated_at: i64,
    ) -> Result<PatchOutcome, SomniaError>;

    async fn patch_subscription(
        &self,
        user_id: &str,
        patch: &SubscriptionPatch,
    ) -> Result<PatchOutcome, SomniaError>;

    // --- Entity catalog ---

    /// Atomic find-or-create by normalized name: inserts with a reference
    /// count of 1 on first mention, otherwise increments the existing row's
    /// count. Returns the catalog id either way.
    async fn upsert_catalog_item(
        &self,
        kind: EntityKind,
        name: &str,
        description: &str,
        category: &str,
    ) -> Result<String, SomniaError>;

    async fn get_catalog_items(
        &self,
        kind: EntityKind,
        ids: &[String],
    ) -> Result<Vec<CatalogItem>, SomniaError>;

    async fn get_catalog_item_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<CatalogItem>, SomniaError>;

    // --- Subscription audit log ---

    async fn record_subscription_event(
        &self,
        user_id: &str,
        event_type: &str,
        payload: Option<&str>,
        created_at: i64,
    ) -> Result<i64, SomniaError>;

    async fn list_subscription_events(
        &self,
        user_id: &str,
    ) -> Result<Vec<SubscriptionEvent>, SomniaError>;

    // --- Task queue ---

    async fn enqueue(&self, queue_name: &str, payload: &str) -> Result<i64, SomniaError>;

    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueEntry>, SomniaError>;

    async fn ack(&self, id: i64) -> Result<(), SomniaError>;

    async fn fail(&self, id: i64) -> Result<(), SomniaError>;
}
