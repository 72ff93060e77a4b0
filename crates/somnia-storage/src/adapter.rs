// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use somnia_config::model::StorageConfig;
use somnia_core::types::{
    AnalysisPatch, CatalogItem, DreamEntry, EntityKind, PatchOutcome, ProfilePatch, QueueEntry,
    SubscriptionEvent, SubscriptionPatch, UserProfile,
};
use somnia_core::{AdapterType, HealthStatus, PluginAdapter, SomniaError, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, SomniaError> {
        self.db.get().ok_or_else(|| {
            SomniaError::Internal("storage not initialized -- call initialize() first".into())
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SomniaError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SomniaError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SomniaError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db
            .set(db)
            .map_err(|_| SomniaError::Internal("storage already initialized".into()))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SomniaError> {
        self.db()?.close().await
    }

    // --- Dream entries ---

    async fn insert_dream(&self, entry: &DreamEntry) -> Result<(), SomniaError> {
        queries::dreams::insert_dream(self.db()?, entry).await
    }

    async fn get_dream(&self, id: &str) -> Result<Option<DreamEntry>, SomniaError> {
        queries::dreams::get_dream(self.db()?, id).await
    }

    async fn list_dreams(&self, user_id: &str) -> Result<Vec<DreamEntry>, SomniaError> {
        queries::dreams::list_dreams(self.db()?, user_id).await
    }

    async fn list_recent_dreams(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<DreamEntry>, SomniaError> {
        queries::dreams::list_recent_dreams(self.db()?, user_id, limit).await
    }

    async fn count_dreams(&self, user_id: &str) -> Result<i64, SomniaError> {
        queries::dreams::count_dreams(self.db()?, user_id).await
    }

    async fn list_entry_days(&self, user_id: &str) -> Result<Vec<i64>, SomniaError> {
        queries::dreams::list_entry_days(self.db()?, user_id).await
    }

    async fn update_dream_text(&self, id: &str, text: &str) -> Result<PatchOutcome, SomniaError> {
        queries::dreams::update_dream_text(self.db()?, id, text).await
    }

    async fn apply_analysis(
        &self,
        id: &str,
        expected_revision: i64,
        patch: &AnalysisPatch,
    ) -> Result<PatchOutcome, SomniaError> {
        queries::dreams::apply_analysis(self.db()?, id, expected_revision, patch).await
    }

    async fn delete_dream(&self, id: &str) -> Result<PatchOutcome, SomniaError> {
        queries::dreams::delete_dream(self.db()?, id).await
    }

    // --- Image pipeline ---

    async fn mark_image_generating(
        &self,
        id: &str,
        attempted_at: i64,
    ) -> Result<PatchOutcome, SomniaError> {
        queries::dreams::mark_image_generating(self.db()?, id, attempted_at).await
    }

    async fn complete_image(&self, id: &str, url: &str) -> Result<PatchOutcome, SomniaError> {
        queries::dreams::complete_image(self.db()?, id, url).await
    }

    async fn fail_image(&self, id: &str) -> Result<PatchOutcome, SomniaError> {
        queries::dreams::fail_image(self.db()?, id).await
    }

    async fn list_retryable_images(
        &self,
        max_retries: i64,
    ) -> Result<Vec<DreamEntry>, SomniaError> {
        queries::dreams::list_retryable_images(self.db()?, max_retries).await
    }

    // --- Users ---

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, SomniaError> {
        queries::users::get_user(self.db()?, user_id).await
    }

    async fn create_user(&self, profile: &UserProfile) -> Result<(), SomniaError> {
        queries::users::create_user(self.db()?, profile).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> Result<PatchOutcome, SomniaError> {
        queries::users::update_profile(self.db()?, user_id, patch).await
    }

    async fn patch_gamification(
        &self,
        user_id: &str,
        expected_version: i64,
        xp: i64,
        level: i64,
        streak: i64,
        last_entry_date: i64,
    ) -> Result<PatchOutcome, SomniaError> {
        queries::users::patch_gamification(
            self.db()?,
            user_id,
            expected_version,
            xp,
            level,
            streak,
            last_entry_date,
        )
        .await
    }

    async fn patch_synthesis(
        &self,
        user_id: &str,
        synthesis_json: &str,
        generated_at: i64,
    ) -> Result<PatchOutcome, SomniaError> {
        queries::users::patch_synthesis(self.db()?, user_id, synthesis_json, generated_at).await
    }

    async fn patch_subscription(
        &self,
        user_id: &str,
        patch: &SubscriptionPatch,
    ) -> Result<PatchOutcome, SomniaError> {
        queries::users::patch_subscription(self.db()?, user_id, patch).await
    }

    // --- Entity catalog ---

    async fn upsert_catalog_item(
        &self,
        kind: EntityKind,
        name: &str,
        description: &str,
        category: &str,
    ) -> Result<String, SomniaError> {
        queries::catalog::upsert_item(self.db()?, kind, name, description, category).await
    }

    async fn get_catalog_items(
        &self,
        kind: EntityKind,
        ids: &[String],
    ) -> Result<Vec<CatalogItem>, SomniaError> {
        queries::catalog::get_items(self.db()?, kind, ids).await
    }

    async fn get_catalog_item_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<CatalogItem>, SomniaError> {
        queries::catalog::get_item_by_name(self.db()?, kind, name).await
    }

    // --- Subscription audit log ---

    async fn record_subscription_event(
        &self,
        user_id: &str,
        event_type: &str,
        payload: Option<&str>,
        created_at: i64,
    ) -> Result<i64, SomniaError> {
        queries::subscriptions::record_event(self.db()?, user_id, event_type, payload, created_at)
            .await
    }

    async fn list_subscription_events(
        &self,
        user_id: &str,
    ) -> Result<Vec<SubscriptionEvent>, SomniaError> {
        queries::subscriptions::list_events(self.db()?, user_id).await
    }

    // --- Task queue ---

    async fn enqueue(&self, queue_name: &str, payload: &str) -> Result<i64, SomniaError> {
        queries::queue::enqueue(self.db()?, queue_name, payload).await
    }

    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueEntry>, SomniaError> {
        queries::queue::dequeue(self.db()?, queue_name).await
    }

    async fn ack(&self, id: i64) -> Result<(), SomniaError> {
        queries::queue::ack(self.db()?, id).await
    }

    async fn fail(&self, id: i64) -> Result<(), SomniaError> {
        queries::queue::fail(self.db()?, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("adapter.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists());
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn uninitialized_storage_reports_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("never.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        let err = storage.get_user("u1").await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn adapter_round_trips_a_dream() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("roundtrip.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let entry = DreamEntry::stub("d1".into(), "u1".into(), "dream text".into(), 1_000);
        storage.insert_dream(&entry).await.unwrap();
        let got = storage.get_dream("d1").await.unwrap().unwrap();
        assert_eq!(got.user_id, "u1");
        storage.shutdown().await.unwrap();
    }
}
