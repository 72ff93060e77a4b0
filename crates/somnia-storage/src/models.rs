// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `somnia-core::types` for use across
//! adapter trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use somnia_core::types::{
    AnalysisPatch, CatalogItem, DreamEntry, EntityRef, ImageStatus, OnboardingStatus, QueueEntry,
    SubscriptionEvent, UserProfile,
};
