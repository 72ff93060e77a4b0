// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `somnia serve` command implementation.
//!
//! Wires SQLite storage, the OpenRouter adapters, and the pipeline, then
//! runs the queue worker in the foreground with the failed-image retry
//! sweep on its own timer. Supports graceful shutdown via signal handlers.

use std::sync::Arc;
use std::time::Duration;

use somnia_config::SomniaConfig;
use somnia_core::{ImageAdapter, PluginAdapter, ProviderAdapter, SomniaError, StorageAdapter};
use somnia_openrouter::{OpenRouterImages, OpenRouterProvider};
use somnia_pipeline::{AnalysisTask, ImagePipeline, SynthesisEngine, Worker};
use somnia_storage::SqliteStorage;
use tracing::{debug, info, warn};

use crate::shutdown;

/// Run the `somnia serve` command.
pub async fn run_serve(config: SomniaConfig) -> Result<(), SomniaError> {
    init_tracing(&config.service.log_level);

    info!(service = config.service.name.as_str(), "starting somnia serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let storage_dyn: Arc<dyn StorageAdapter> = storage.clone();

    let provider: Arc<dyn ProviderAdapter> = Arc::new(OpenRouterProvider::new(&config)?);
    let image_adapter: Arc<dyn ImageAdapter> = Arc::new(OpenRouterImages::new(&config)?);

    let worker = Worker::new(
        storage_dyn.clone(),
        AnalysisTask::new(storage_dyn.clone(), provider.clone(), &config),
        SynthesisEngine::new(storage_dyn.clone(), provider, &config),
        ImagePipeline::new(storage_dyn.clone(), image_adapter.clone(), &config),
        Duration::from_secs(config.worker.poll_interval_secs),
    );

    let cancel = shutdown::install_signal_handler();

    // Failed-image retry sweep on its own fixed interval.
    {
        let sweep = ImagePipeline::new(storage_dyn, image_adapter, &config);
        let sweep_cancel = cancel.clone();
        let interval_secs = config.images.sweep_interval_secs;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // Skip the first immediate tick.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match sweep.sweep().await {
                            Ok(0) => debug!("image sweep: nothing to retry"),
                            Ok(count) => info!(count, "image sweep retried failed generations"),
                            Err(e) => warn!(error = %e, "image sweep failed (non-fatal)"),
                        }
                    }
                    _ = sweep_cancel.cancelled() => {
                        info!("image sweep shutting down");
                        break;
                    }
                }
            }
        });
        info!(interval_secs, "image retry sweep started");
    }

    worker.run(cancel).await;

    storage.shutdown().await?;
    info!("somnia serve shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber from config, honoring `RUST_LOG`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("somnia={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
