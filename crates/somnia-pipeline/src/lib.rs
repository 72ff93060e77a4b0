// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Somnia dream pipeline: ingestion, normalization, gamification,
//! discovery, synthesis, and image retry.
//!
//! Control flow: a client submits dream text -> [`journal::DreamJournal`]
//! inserts a stub row and applies the gamification update synchronously ->
//! analysis, synthesis, and image jobs land on the durable queue ->
//! [`worker::Worker`] drains them in the background -> reads are served by
//! [`discovery::DiscoveryAggregator`]. The failed-image sweep runs on its
//! own timer, independent of user action.

pub mod analysis;
pub mod discovery;
pub mod gamification;
pub mod images;
pub mod journal;
pub mod profiles;
pub mod registry;
pub mod synthesis;
pub mod taxonomy;
pub mod worker;

pub use analysis::{AnalysisOutcome, AnalysisTask};
pub use discovery::{Discoveries, DiscoveryAggregator};
pub use images::{ImageOutcome, ImagePipeline};
pub use journal::DreamJournal;
pub use profiles::ProfileService;
pub use registry::{EntityMention, EntityRegistry};
pub use synthesis::{Synthesis, SynthesisEngine};
pub use worker::Worker;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
