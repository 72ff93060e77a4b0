// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background queue worker: drains analysis, synthesis, and image jobs.
//!
//! Jobs are durable rows in the storage queue, enqueued by the save path
//! and executed at-least-once here. Provider failures inside a task resolve
//! to that task's inert fallback and the job is acked; storage failures
//! fail the job so the queue retries it up to its attempt cap.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use somnia_core::types::QueueEntry;
use somnia_core::{SomniaError, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::AnalysisTask;
use crate::images::ImagePipeline;
use crate::synthesis::SynthesisEngine;

/// Queue names, one per job type.
pub const ANALYSIS_QUEUE: &str = "analysis";
pub const SYNTHESIS_QUEUE: &str = "synthesis";
pub const IMAGE_QUEUE: &str = "image";

/// Payload of an analysis job, keyed by user and dream.
///
/// `revision` pins the dream revision the job was scheduled against; the
/// patch is discarded if the entry was edited or deleted since.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub user_id: String,
    pub dream_id: String,
    pub revision: i64,
}

/// Payload of a synthesis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisJob {
    pub user_id: String,
}

/// Payload of an image generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageJob {
    pub dream_id: String,
}

/// Polls the durable queues and executes jobs until cancelled.
pub struct Worker {
    storage: Arc<dyn StorageAdapter>,
    analysis: AnalysisTask,
    synthesis: SynthesisEngine,
    images: ImagePipeline,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        analysis: AnalysisTask,
        synthesis: SynthesisEngine,
        images: ImagePipeline,
        poll_interval: Duration,
    ) -> Self {
        Self {
            storage,
            analysis,
            synthesis,
            images,
            poll_interval,
        }
    }

    /// Run the polling loop until the token is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain().await {
                        warn!(error = %e, "queue drain failed (will retry next tick)");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("worker shutting down");
                    break;
                }
            }
        }
    }

    /// Drain every pending entry across all queues once.
    pub async fn drain(&self) -> Result<(), SomniaError> {
        for queue_name in [ANALYSIS_QUEUE, SYNTHESIS_QUEUE, IMAGE_QUEUE] {
            while let Some(entry) = self.storage.dequeue(queue_name).await? {
                self.process(queue_name, entry).await?;
            }
        }
        Ok(())
    }

    /// Execute one claimed queue entry, then ack or fail it.
    ///
    /// An undecodable payload is acked and dropped -- retrying cannot fix it.
    async fn process(&self, queue_name: &str, entry: QueueEntry) -> Result<(), SomniaError> {
        let outcome = match queue_name {
            ANALYSIS_QUEUE => match serde_json::from_str::<AnalysisJob>(&entry.payload) {
                Ok(job) => self.analysis.execute(&job).await.map(|outcome| {
                    debug!(dream_id = %job.dream_id, ?outcome, "analysis job finished");
                }),
                Err(e) => {
                    warn!(id = entry.id, error = %e, "dropping undecodable analysis payload");
                    Ok(())
                }
            },
            SYNTHESIS_QUEUE => match serde_json::from_str::<SynthesisJob>(&entry.payload) {
                Ok(job) => self.synthesis.execute(&job.user_id).await.map(|result| {
                    debug!(user_id = %job.user_id, generated = result.is_some(), "synthesis job finished");
                }),
                Err(e) => {
                    warn!(id = entry.id, error = %e, "dropping undecodable synthesis payload");
                    Ok(())
                }
            },
            IMAGE_QUEUE => match serde_json::from_str::<ImageJob>(&entry.payload) {
                Ok(job) => self.images.generate(&job.dream_id).await.map(|outcome| {
                    debug!(dream_id = %job.dream_id, ?outcome, "image job finished");
                }),
                Err(e) => {
                    warn!(id = entry.id, error = %e, "dropping undecodable image payload");
                    Ok(())
                }
            },
            other => {
                warn!(queue = other, id = entry.id, "unknown queue name, dropping entry");
                Ok(())
            }
        };

        match outcome {
            Ok(()) => self.storage.ack(entry.id).await,
            Err(e) => {
                warn!(queue = queue_name, id = entry.id, error = %e, "job failed, queueing retry");
                self.storage.fail(entry.id).await
            }
        }
    }
}
