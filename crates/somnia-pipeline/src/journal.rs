// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dream journal: the user-facing record store for dream entries.
//!
//! `save` is the hot path: one stub insert, a synchronous gamification
//! patch, and three fire-and-forget job enqueues. Callers get the entry id
//! back immediately and never wait for analysis, image generation, or
//! synthesis.

use std::sync::Arc;

use somnia_core::types::{DreamEntry, PatchOutcome};
use somnia_core::{SomniaError, StorageAdapter};
use tracing::{debug, info, warn};

use crate::gamification::{advance_streak, apply_xp, day_of, streak_from_days};
use crate::now_ms;
use crate::worker::{ANALYSIS_QUEUE, AnalysisJob, IMAGE_QUEUE, ImageJob, SYNTHESIS_QUEUE, SynthesisJob};

/// Bounded retries for the version-guarded gamification patch.
const GAMIFICATION_RETRIES: u32 = 3;

/// User-facing dream record store.
pub struct DreamJournal {
    storage: Arc<dyn StorageAdapter>,
}

impl DreamJournal {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Save a new dream entry and return its id.
    ///
    /// Inserts a stub row (empty analysis fields), applies the gamification
    /// update for the owner in the same logical operation, then enqueues the
    /// analysis, synthesis, and image jobs. `created_at` is the dream night;
    /// it defaults to now.
    pub async fn save(
        &self,
        user_id: &str,
        text: &str,
        created_at: Option<i64>,
    ) -> Result<String, SomniaError> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = created_at.unwrap_or_else(now_ms);
        let entry = DreamEntry::stub(id.clone(), user_id.to_string(), text.to_string(), created_at);

        self.storage.insert_dream(&entry).await?;
        self.apply_gamification(user_id, created_at).await?;

        let analysis = AnalysisJob {
            user_id: user_id.to_string(),
            dream_id: id.clone(),
            revision: 0,
        };
        self.enqueue_json(ANALYSIS_QUEUE, &analysis).await?;
        self.enqueue_json(SYNTHESIS_QUEUE, &SynthesisJob { user_id: user_id.to_string() })
            .await?;
        self.enqueue_json(IMAGE_QUEUE, &ImageJob { dream_id: id.clone() })
            .await?;

        info!(dream_id = %id, user_id, "dream saved");
        Ok(id)
    }

    async fn enqueue_json<T: serde::Serialize>(
        &self,
        queue_name: &str,
        job: &T,
    ) -> Result<(), SomniaError> {
        let payload = serde_json::to_string(job)
            .map_err(|e| SomniaError::Internal(format!("job encode: {e}")))?;
        self.storage.enqueue(queue_name, &payload).await?;
        Ok(())
    }

    /// Apply the per-entry XP award and streak update for a user.
    ///
    /// A missing user row skips the update without failing the save. The
    /// patch is version-guarded; on a concurrent-save conflict the state is
    /// re-read and recomputed, a bounded number of times.
    async fn apply_gamification(&self, user_id: &str, created_at: i64) -> Result<(), SomniaError> {
        for _ in 0..GAMIFICATION_RETRIES {
            let Some(user) = self.storage.get_user(user_id).await? else {
                debug!(user_id, "gamification skipped: user not found");
                return Ok(());
            };

            let (xp, level) = apply_xp(user.xp, user.level);
            let streak = self
                .resolve_streak(user_id, user.streak, user.last_entry_date, created_at)
                .await?;

            match self
                .storage
                .patch_gamification(user_id, user.version, xp, level, streak, created_at)
                .await?
            {
                PatchOutcome::Applied => {
                    debug!(user_id, xp, level, streak, "gamification updated");
                    return Ok(());
                }
                PatchOutcome::NotFound => {
                    debug!(user_id, "gamification skipped: user disappeared");
                    return Ok(());
                }
                PatchOutcome::Stale => {
                    debug!(user_id, "concurrent gamification update, re-reading");
                }
            }
        }
        warn!(user_id, "gamification patch abandoned after repeated version conflicts");
        Ok(())
    }

    /// Incremental streak when the stored state is fresh, full recompute
    /// from distinct entry days otherwise.
    async fn resolve_streak(
        &self,
        user_id: &str,
        stored_streak: i64,
        last_entry_date: Option<i64>,
        created_at: i64,
    ) -> Result<i64, SomniaError> {
        let today = day_of(now_ms());
        let new_day = day_of(created_at);
        if let Some(streak) =
            advance_streak(stored_streak, last_entry_date.map(day_of), new_day, today)
        {
            return Ok(streak);
        }

        let mut days = self.storage.list_entry_days(user_id).await?;
        // The just-inserted row is normally visible already; include its day
        // defensively in case it is not.
        if !days.contains(&new_day) {
            days.push(new_day);
            days.sort_unstable_by(|a, b| b.cmp(a));
        }
        Ok(streak_from_days(&days, today))
    }

    /// Recompute streak state from scratch, keeping XP and level.
    ///
    /// Repair path used after deletions, which can invalidate the
    /// incrementally maintained streak.
    pub async fn repair_streak(&self, user_id: &str) -> Result<(), SomniaError> {
        for _ in 0..GAMIFICATION_RETRIES {
            let Some(user) = self.storage.get_user(user_id).await? else {
                return Ok(());
            };
            let days = self.storage.list_entry_days(user_id).await?;
            let streak = streak_from_days(&days, day_of(now_ms()));
            let last_entry = days.first().map(|d| d * somnia_core::types::DAY_MS);

            match self
                .storage
                .patch_gamification(
                    user_id,
                    user.version,
                    user.xp,
                    user.level,
                    streak,
                    last_entry.or(user.last_entry_date).unwrap_or(0),
                )
                .await?
            {
                PatchOutcome::Stale => continue,
                _ => return Ok(()),
            }
        }
        warn!(user_id, "streak repair abandoned after repeated version conflicts");
        Ok(())
    }

    /// User-initiated text edit. Bumps the revision so in-flight analysis
    /// patches for the old text are discarded. Re-analysis is the caller's
    /// decision, via [`DreamJournal::request_analysis`].
    pub async fn update_text(&self, id: &str, text: &str) -> Result<PatchOutcome, SomniaError> {
        let outcome = self.storage.update_dream_text(id, text).await?;
        if outcome == PatchOutcome::NotFound {
            debug!(dream_id = id, "text update target not found");
        }
        Ok(outcome)
    }

    /// Enqueue a fresh analysis job for an existing entry at its current
    /// revision.
    pub async fn request_analysis(&self, id: &str) -> Result<PatchOutcome, SomniaError> {
        let Some(dream) = self.storage.get_dream(id).await? else {
            return Ok(PatchOutcome::NotFound);
        };
        let job = AnalysisJob {
            user_id: dream.user_id.clone(),
            dream_id: dream.id.clone(),
            revision: dream.revision,
        };
        self.enqueue_json(ANALYSIS_QUEUE, &job).await?;
        Ok(PatchOutcome::Applied)
    }

    /// Hard delete. Catalog reference counts are left untouched (lifetime
    /// mention counts); the owner's streak is repaired afterwards.
    pub async fn delete(&self, id: &str) -> Result<PatchOutcome, SomniaError> {
        let owner = self.storage.get_dream(id).await?.map(|d| d.user_id);
        let outcome = self.storage.delete_dream(id).await?;
        if outcome == PatchOutcome::Applied
            && let Some(user_id) = owner
        {
            self.repair_streak(&user_id).await?;
            info!(dream_id = id, "dream deleted");
        }
        Ok(outcome)
    }

    /// All entries for a user, newest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<DreamEntry>, SomniaError> {
        self.storage.list_dreams(user_id).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<DreamEntry>, SomniaError> {
        self.storage.get_dream(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use somnia_config::model::StorageConfig;
    use somnia_core::types::{DAY_MS, UserProfile};
    use somnia_storage::SqliteStorage;
    use tempfile::tempdir;

    async fn setup() -> (DreamJournal, Arc<SqliteStorage>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("test.db").display().to_string(),
        };
        let storage = Arc::new(SqliteStorage::new(config));
        storage.initialize().await.unwrap();
        let journal = DreamJournal::new(storage.clone());
        (journal, storage, dir)
    }

    #[tokio::test]
    async fn save_creates_stub_and_awards_xp_and_streak() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();

        let id = journal
            .save("u1", "I was flying over mountains", None)
            .await
            .unwrap();

        let dream = storage.get_dream(&id).await.unwrap().unwrap();
        assert_eq!(dream.text, "I was flying over mountains");
        assert!(dream.interpretation.is_none());

        let user = storage.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.xp, 10);
        assert_eq!(user.level, 1);
        assert_eq!(user.streak, 1, "first entry today starts a streak of 1");
        assert_eq!(user.last_entry_date, Some(dream.created_at));
    }

    #[tokio::test]
    async fn save_enqueues_analysis_synthesis_and_image_jobs() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();

        let id = journal.save("u1", "a dream", None).await.unwrap();

        let analysis = storage.dequeue(ANALYSIS_QUEUE).await.unwrap().unwrap();
        let job: AnalysisJob = serde_json::from_str(&analysis.payload).unwrap();
        assert_eq!(job.dream_id, id);
        assert_eq!(job.revision, 0);

        assert!(storage.dequeue(SYNTHESIS_QUEUE).await.unwrap().is_some());
        assert!(storage.dequeue(IMAGE_QUEUE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn save_without_user_row_still_persists_the_dream() {
        let (journal, storage, _dir) = setup().await;

        let id = journal.save("ghost", "a dream", None).await.unwrap();
        assert!(storage.get_dream(&id).await.unwrap().is_some());
        assert!(storage.get_user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn consecutive_daily_saves_extend_the_streak() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();

        let now = now_ms();
        journal.save("u1", "two days ago", Some(now - 2 * DAY_MS)).await.unwrap();
        journal.save("u1", "yesterday", Some(now - DAY_MS)).await.unwrap();
        journal.save("u1", "today", Some(now)).await.unwrap();

        let user = storage.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.streak, 3);
        assert_eq!(user.xp, 30);
    }

    #[tokio::test]
    async fn gap_resets_streak_to_one() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();

        let now = now_ms();
        journal.save("u1", "long ago", Some(now - 5 * DAY_MS)).await.unwrap();
        journal.save("u1", "today", Some(now)).await.unwrap();

        let user = storage.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.streak, 1);
    }

    #[tokio::test]
    async fn backdated_entry_recomputes_instead_of_clobbering() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();

        let now = now_ms();
        journal.save("u1", "yesterday", Some(now - DAY_MS)).await.unwrap();
        journal.save("u1", "today", Some(now)).await.unwrap();
        // Backdating an old night must not destroy the live streak.
        journal.save("u1", "last week", Some(now - 7 * DAY_MS)).await.unwrap();

        let user = storage.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.streak, 2);
    }

    #[tokio::test]
    async fn xp_level_transition_at_threshold() {
        let (journal, storage, _dir) = setup().await;
        let mut profile = UserProfile::new("u1".into(), 0);
        profile.xp = 90;
        profile.level = 1;
        storage.create_user(&profile).await.unwrap();

        journal.save("u1", "the tenth dream", None).await.unwrap();

        let user = storage.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.xp, 100);
        assert_eq!(user.level, 2);
    }

    #[tokio::test]
    async fn update_text_bumps_revision() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();
        let id = journal.save("u1", "original", None).await.unwrap();

        assert_eq!(
            journal.update_text(&id, "edited").await.unwrap(),
            PatchOutcome::Applied
        );
        let dream = storage.get_dream(&id).await.unwrap().unwrap();
        assert_eq!(dream.text, "edited");
        assert_eq!(dream.revision, 1);

        assert_eq!(
            journal.update_text("missing", "x").await.unwrap(),
            PatchOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn request_analysis_uses_current_revision() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();
        let id = journal.save("u1", "original", None).await.unwrap();
        journal.update_text(&id, "edited").await.unwrap();

        // Drop the save-time job so the requeued one is observable.
        let first = storage.dequeue(ANALYSIS_QUEUE).await.unwrap().unwrap();
        storage.ack(first.id).await.unwrap();

        journal.request_analysis(&id).await.unwrap();
        let entry = storage.dequeue(ANALYSIS_QUEUE).await.unwrap().unwrap();
        let job: AnalysisJob = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(job.revision, 1);
    }

    #[tokio::test]
    async fn delete_repairs_the_streak() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();

        let now = now_ms();
        journal.save("u1", "yesterday", Some(now - DAY_MS)).await.unwrap();
        let today_id = journal.save("u1", "today", Some(now)).await.unwrap();
        assert_eq!(storage.get_user("u1").await.unwrap().unwrap().streak, 2);

        journal.delete(&today_id).await.unwrap();
        let user = storage.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.streak, 1, "yesterday alone is still a live streak");
        assert_eq!(user.xp, 20, "deletion never claws back XP");
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let (journal, storage, _dir) = setup().await;
        storage.create_user(&UserProfile::new("u1".into(), 0)).await.unwrap();

        journal.save("u1", "first", Some(1_000)).await.unwrap();
        journal.save("u1", "second", Some(2_000)).await.unwrap();

        let dreams = journal.list("u1").await.unwrap();
        assert_eq!(dreams.len(), 2);
        assert_eq!(dreams[0].text, "second");
    }
}
