// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end test harness: tempdir SQLite storage, mock provider, and the
//! full pipeline wired the way `somnia serve` wires it.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use somnia_config::SomniaConfig;
use somnia_config::model::StorageConfig;
use somnia_core::StorageAdapter;
use somnia_pipeline::{
    AnalysisTask, DiscoveryAggregator, DreamJournal, ImagePipeline, ProfileService,
    SynthesisEngine, Worker,
};
use somnia_storage::SqliteStorage;

use crate::mock_provider::MockProvider;

/// A fully wired pipeline over throwaway storage and a mock provider.
///
/// The temp directory lives as long as the harness; dropping the harness
/// deletes the database.
pub struct TestHarness {
    pub config: SomniaConfig,
    pub storage: Arc<SqliteStorage>,
    pub provider: Arc<MockProvider>,
    pub journal: DreamJournal,
    pub profiles: ProfileService,
    pub discovery: DiscoveryAggregator,
    worker: Worker,
    _dir: TempDir,
}

impl TestHarness {
    /// Build a harness with initialized storage and empty mock queues.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let mut config = SomniaConfig::default();
        config.storage = StorageConfig {
            database_path: dir.path().join("somnia.db").display().to_string(),
        };

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await.expect("storage init");

        let provider = Arc::new(MockProvider::new());
        let storage_dyn: Arc<dyn StorageAdapter> = storage.clone();

        let journal = DreamJournal::new(storage_dyn.clone());
        let profiles = ProfileService::new(storage_dyn.clone());
        let discovery = DiscoveryAggregator::new(storage_dyn.clone());
        let worker = Worker::new(
            storage_dyn.clone(),
            AnalysisTask::new(storage_dyn.clone(), provider.clone(), &config),
            SynthesisEngine::new(storage_dyn.clone(), provider.clone(), &config),
            ImagePipeline::new(storage_dyn, provider.clone(), &config),
            Duration::from_millis(50),
        );

        Self {
            config,
            storage,
            provider,
            journal,
            profiles,
            discovery,
            worker,
            _dir: dir,
        }
    }

    /// Drain every pending background job once, as the worker loop would.
    pub async fn drain_jobs(&self) {
        self.worker.drain().await.expect("queue drain");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_wires_a_working_pipeline() {
        let harness = TestHarness::new().await;
        harness.profiles.sync_user("u1").await.unwrap();
        let id = harness.journal.save("u1", "a short dream", None).await.unwrap();
        assert!(harness.journal.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn drain_jobs_consumes_the_queues() {
        let harness = TestHarness::new().await;
        harness.profiles.sync_user("u1").await.unwrap();
        harness.journal.save("u1", "a short dream", None).await.unwrap();

        // No canned responses: analysis falls back, synthesis no-ops (one
        // entry), image generation fails. All jobs still settle.
        harness.drain_jobs().await;

        let dreams = harness.journal.list("u1").await.unwrap();
        assert!(dreams[0].interpretation.is_some(), "fallback applied");
    }
}
