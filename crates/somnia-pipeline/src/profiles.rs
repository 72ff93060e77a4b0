// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User profile lifecycle: auth sync, profile edits, subscription events.

use std::sync::Arc;

use somnia_core::types::{PatchOutcome, ProfilePatch, SubscriptionPatch, UserProfile};
use somnia_core::{SomniaError, StorageAdapter};
use tracing::{debug, info};

use crate::now_ms;

/// Subscription tier that unlocks gated features.
const PRO_TIER: &str = "pro";

/// Manages user rows around the gamified journal.
pub struct ProfileService {
    storage: Arc<dyn StorageAdapter>,
}

impl ProfileService {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Find-or-create the user row on auth sync.
    pub async fn sync_user(&self, user_id: &str) -> Result<UserProfile, SomniaError> {
        if let Some(existing) = self.storage.get_user(user_id).await? {
            return Ok(existing);
        }
        let profile = UserProfile::new(user_id.to_string(), now_ms());
        self.storage.create_user(&profile).await?;
        info!(user_id, "user profile created on first sync");
        Ok(profile)
    }

    /// Patch user-editable profile fields.
    pub async fn update_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> Result<PatchOutcome, SomniaError> {
        let outcome = self.storage.update_profile(user_id, patch).await?;
        if outcome == PatchOutcome::NotFound {
            debug!(user_id, "profile update target not found");
        }
        Ok(outcome)
    }

    /// Append a subscription audit row and patch the user's entitlement
    /// fields in the same step. The audit log is append-only.
    pub async fn apply_subscription_event(
        &self,
        user_id: &str,
        event_type: &str,
        patch: &SubscriptionPatch,
        payload: Option<&str>,
    ) -> Result<i64, SomniaError> {
        let event_id = self
            .storage
            .record_subscription_event(user_id, event_type, payload, now_ms())
            .await?;
        let outcome = self.storage.patch_subscription(user_id, patch).await?;
        if outcome == PatchOutcome::NotFound {
            debug!(user_id, event_type, "subscription patch target not found");
        }
        info!(user_id, event_type, event_id, "subscription event recorded");
        Ok(event_id)
    }
}

/// Whether a profile currently carries a pro entitlement.
///
/// A missing expiry means a non-expiring entitlement. The flag is consumed
/// by gated features; nothing in the pipeline produces it.
pub fn is_pro(profile: &UserProfile, now: i64) -> bool {
    profile.subscription_tier.as_deref() == Some(PRO_TIER)
        && profile.subscription_expiry.is_none_or(|expiry| expiry > now)
}
