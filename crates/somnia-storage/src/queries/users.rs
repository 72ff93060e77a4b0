// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User profile operations: gamification, synthesis, subscription patches.

use rusqlite::params;
use somnia_core::SomniaError;
use somnia_core::types::{OnboardingStatus, PatchOutcome, ProfilePatch, SubscriptionPatch, UserProfile};

use crate::database::Database;

const USER_COLUMNS: &str = "user_id, xp, level, streak, last_entry_date, dream_frequency, \
     primary_goal, marketing_vibe, onboarding_status, subscription_tier, subscription_plan, \
     subscription_expiry, customer_id, last_synthesis, last_synthesis_date, version, created_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> Result<UserProfile, rusqlite::Error> {
    let onboarding_raw: String = row.get(8)?;
    let onboarding_status = onboarding_raw.parse::<OnboardingStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(UserProfile {
        user_id: row.get(0)?,
        xp: row.get(1)?,
        level: row.get(2)?,
        streak: row.get(3)?,
        last_entry_date: row.get(4)?,
        dream_frequency: row.get(5)?,
        primary_goal: row.get(6)?,
        marketing_vibe: row.get(7)?,
        onboarding_status,
        subscription_tier: row.get(9)?,
        subscription_plan: row.get(10)?,
        subscription_expiry: row.get(11)?,
        customer_id: row.get(12)?,
        last_synthesis: row.get(13)?,
        last_synthesis_date: row.get(14)?,
        version: row.get(15)?,
        created_at: row.get(16)?,
    })
}

/// Insert a new user profile row.
pub async fn create_user(db: &Database, profile: &UserProfile) -> Result<(), SomniaError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (user_id, xp, level, streak, last_entry_date, \
                 dream_frequency, primary_goal, marketing_vibe, onboarding_status, \
                 subscription_tier, subscription_plan, subscription_expiry, customer_id, \
                 last_synthesis, last_synthesis_date, version, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    profile.user_id,
                    profile.xp,
                    profile.level,
                    profile.streak,
                    profile.last_entry_date,
                    profile.dream_frequency,
                    profile.primary_goal,
                    profile.marketing_vibe,
                    profile.onboarding_status.to_string(),
                    profile.subscription_tier,
                    profile.subscription_plan,
                    profile.subscription_expiry,
                    profile.customer_id,
                    profile.last_synthesis,
                    profile.last_synthesis_date,
                    profile.version,
                    profile.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user profile by external auth identity.
pub async fn get_user(db: &Database, user_id: &str) -> Result<Option<UserProfile>, SomniaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"))?;
            match stmt.query_row(params![user_id], user_from_row) {
                Ok(profile) => Ok(Some(profile)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Patch user-editable profile fields. Absent fields are left unchanged.
pub async fn update_profile(
    db: &Database,
    user_id: &str,
    patch: &ProfilePatch,
) -> Result<PatchOutcome, SomniaError> {
    let user_id = user_id.to_string();
    let patch = patch.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET \
                 dream_frequency = COALESCE(?1, dream_frequency), \
                 primary_goal = COALESCE(?2, primary_goal), \
                 marketing_vibe = COALESCE(?3, marketing_vibe), \
                 onboarding_status = COALESCE(?4, onboarding_status) \
                 WHERE user_id = ?5",
                params![
                    patch.dream_frequency,
                    patch.primary_goal,
                    patch.marketing_vibe,
                    patch.onboarding_status.map(|s| s.to_string()),
                    user_id,
                ],
            )?;
            Ok(if changed == 0 {
                PatchOutcome::NotFound
            } else {
                PatchOutcome::Applied
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Version-guarded gamification patch.
///
/// Bumps `version` on success; returns `Stale` when a concurrent save
/// advanced the version after the caller read the row.
#[allow(clippy::too_many_arguments)]
pub async fn patch_gamification(
    db: &Database,
    user_id: &str,
    expected_version: i64,
    xp: i64,
    level: i64,
    streak: i64,
    last_entry_date: i64,
) -> Result<PatchOutcome, SomniaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE users SET xp = ?1, level = ?2, streak = ?3, last_entry_date = ?4, \
                 version = version + 1 WHERE user_id = ?5 AND version = ?6",
                params![xp, level, streak, last_entry_date, user_id, expected_version],
            )?;
            let outcome = if changed == 1 {
                PatchOutcome::Applied
            } else {
                let exists = tx.query_row(
                    "SELECT COUNT(*) FROM users WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get::<_, i64>(0),
                )? > 0;
                if exists { PatchOutcome::Stale } else { PatchOutcome::NotFound }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite the stored synthesis (later write wins).
pub async fn patch_synthesis(
    db: &Database,
    user_id: &str,
    synthesis_json: &str,
    generated_at: i64,
) -> Result<PatchOutcome, SomniaError> {
    let user_id = user_id.to_string();
    let synthesis_json = synthesis_json.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET last_synthesis = ?1, last_synthesis_date = ?2 WHERE user_id = ?3",
                params![synthesis_json, generated_at, user_id],
            )?;
            Ok(if changed == 0 {
                PatchOutcome::NotFound
            } else {
                PatchOutcome::Applied
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Patch subscription fields alongside a subscription event.
pub async fn patch_subscription(
    db: &Database,
    user_id: &str,
    patch: &SubscriptionPatch,
) -> Result<PatchOutcome, SomniaError> {
    let user_id = user_id.to_string();
    let patch = patch.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET \
                 subscription_tier = COALESCE(?1, subscription_tier), \
                 subscription_plan = COALESCE(?2, subscription_plan), \
                 subscription_expiry = COALESCE(?3, subscription_expiry), \
                 customer_id = COALESCE(?4, customer_id) \
                 WHERE user_id = ?5",
                params![patch.tier, patch.plan, patch.expiry, patch.customer_id, user_id],
            )?;
            Ok(if changed == 0 {
                PatchOutcome::NotFound
            } else {
                PatchOutcome::Applied
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}
