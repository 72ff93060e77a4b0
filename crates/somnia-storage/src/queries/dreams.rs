// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dream entry CRUD and patch operations.
//!
//! Entity lists and secondary sentiments are stored as JSON text columns;
//! aggregation reads scan a user's rows rather than a reverse index, an
//! explicit tradeoff favoring write simplicity.

use rusqlite::params;
use somnia_core::types::{AnalysisPatch, DAY_MS, DreamEntry, ImageStatus, PatchOutcome};
use somnia_core::SomniaError;

use crate::database::Database;

const DREAM_COLUMNS: &str = "id, user_id, text, interpretation, sentiment, \
     secondary_sentiments, symbols, archetypes, emotions, lumi_quote, guidance, \
     image_url, image_status, image_retry_count, image_last_attempt, revision, created_at";

/// Decode a JSON text column, surfacing decode failures as conversion errors.
fn json_col<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<T, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn dream_from_row(row: &rusqlite::Row<'_>) -> Result<DreamEntry, rusqlite::Error> {
    let status_raw: String = row.get(12)?;
    let image_status = status_raw.parse::<ImageStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(DreamEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        interpretation: row.get(3)?,
        sentiment: row.get(4)?,
        secondary_sentiments: json_col(row, 5)?,
        symbols: json_col(row, 6)?,
        archetypes: json_col(row, 7)?,
        emotions: json_col(row, 8)?,
        lumi_quote: row.get(9)?,
        guidance: row.get(10)?,
        image_url: row.get(11)?,
        image_status,
        image_retry_count: row.get(13)?,
        image_last_attempt: row.get(14)?,
        revision: row.get(15)?,
        created_at: row.get(16)?,
    })
}

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, SomniaError> {
    serde_json::to_string(value).map_err(|e| SomniaError::Internal(format!("json encode: {e}")))
}

/// Insert a new dream entry.
pub async fn insert_dream(db: &Database, entry: &DreamEntry) -> Result<(), SomniaError> {
    let entry = entry.clone();
    let secondary = encode_json(&entry.secondary_sentiments)?;
    let symbols = encode_json(&entry.symbols)?;
    let archetypes = encode_json(&entry.archetypes)?;
    let emotions = encode_json(&entry.emotions)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO dreams (id, user_id, text, interpretation, sentiment, \
                 secondary_sentiments, symbols, archetypes, emotions, lumi_quote, guidance, \
                 image_url, image_status, image_retry_count, image_last_attempt, revision, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    entry.id,
                    entry.user_id,
                    entry.text,
                    entry.interpretation,
                    entry.sentiment,
                    secondary,
                    symbols,
                    archetypes,
                    emotions,
                    entry.lumi_quote,
                    entry.guidance,
                    entry.image_url,
                    entry.image_status.to_string(),
                    entry.image_retry_count,
                    entry.image_last_attempt,
                    entry.revision,
                    entry.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a dream entry by id.
pub async fn get_dream(db: &Database, id: &str) -> Result<Option<DreamEntry>, SomniaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {DREAM_COLUMNS} FROM dreams WHERE id = ?1"))?;
            match stmt.query_row(params![id], dream_from_row) {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All entries for a user, newest first.
pub async fn list_dreams(db: &Database, user_id: &str) -> Result<Vec<DreamEntry>, SomniaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DREAM_COLUMNS} FROM dreams WHERE user_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], dream_from_row)?;
            let mut dreams = Vec::new();
            for row in rows {
                dreams.push(row?);
            }
            Ok(dreams)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The `limit` most recent entries for a user, newest first.
pub async fn list_recent_dreams(
    db: &Database,
    user_id: &str,
    limit: i64,
) -> Result<Vec<DreamEntry>, SomniaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DREAM_COLUMNS} FROM dreams WHERE user_id = ?1 \
                 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![user_id, limit], dream_from_row)?;
            let mut dreams = Vec::new();
            for row in rows {
                dreams.push(row?);
            }
            Ok(dreams)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of entries a user has.
pub async fn count_dreams(db: &Database, user_id: &str) -> Result<i64, SomniaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM dreams WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Distinct entry days (epoch-day buckets) for a user, descending.
pub async fn list_entry_days(db: &Database, user_id: &str) -> Result<Vec<i64>, SomniaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT DISTINCT created_at / {DAY_MS} AS day FROM dreams \
                 WHERE user_id = ?1 ORDER BY day DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
            let mut days = Vec::new();
            for row in rows {
                days.push(row?);
            }
            Ok(days)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Patch the raw text and bump the revision counter.
pub async fn update_dream_text(
    db: &Database,
    id: &str,
    text: &str,
) -> Result<PatchOutcome, SomniaError> {
    let id = id.to_string();
    let text = text.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE dreams SET text = ?1, revision = revision + 1 WHERE id = ?2",
                params![text, id],
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

/// Apply an analysis patch iff the row exists and the revision still matches.
pub async fn apply_analysis(
    db: &Database,
    id: &str,
    expected_revision: i64,
    patch: &AnalysisPatch,
) -> Result<PatchOutcome, SomniaError> {
    let id = id.to_string();
    let patch = patch.clone();
    let secondary = encode_json(&patch.secondary_sentiments)?;
    let symbols = encode_json(&patch.symbols)?;
    let archetypes = encode_json(&patch.archetypes)?;
    let emotions = encode_json(&patch.emotions)?;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current = {
                let mut stmt = tx.prepare("SELECT revision FROM dreams WHERE id = ?1")?;
                match stmt.query_row(params![id], |row| row.get::<_, i64>(0)) {
                    Ok(rev) => Some(rev),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };
            let outcome = match current {
                None => PatchOutcome::NotFound,
                Some(rev) if rev != expected_revision => PatchOutcome::Stale,
                Some(_) => {
                    tx.execute(
                        "UPDATE dreams SET interpretation = ?1, sentiment = ?2, \
                         secondary_sentiments = ?3, symbols = ?4, archetypes = ?5, \
                         emotions = ?6, lumi_quote = ?7, guidance = ?8 WHERE id = ?9",
                        params![
                            patch.interpretation,
                            patch.sentiment,
                            secondary,
                            symbols,
                            archetypes,
                            emotions,
                            patch.lumi_quote,
                            patch.guidance,
                            id,
                        ],
                    )?;
                    PatchOutcome::Applied
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Hard delete. Catalog reference counts are not touched.
pub async fn delete_dream(db: &Database, id: &str) -> Result<PatchOutcome, SomniaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM dreams WHERE id = ?1", params![id])?;
            Ok(if changed == 0 {
                PatchOutcome::NotFound
            } else {
                PatchOutcome::Applied
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition to `generating`, incrementing the retry count and stamping the
/// attempt time.
pub async fn mark_image_generating(
    db: &Database,
    id: &str,
    attempted_at: i64,
) -> Result<PatchOutcome, SomniaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE dreams SET image_status = 'generating', \
                 image_retry_count = image_retry_count + 1, image_last_attempt = ?1 \
                 WHERE id = ?2",
                params![attempted_at, id],
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

/// Store the generated image URL and mark the entry completed.
pub async fn complete_image(
    db: &Database,
    id: &str,
    url: &str,
) -> Result<PatchOutcome, SomniaError> {
    let id = id.to_string();
    let url = url.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE dreams SET image_status = 'completed', image_url = ?1 WHERE id = ?2",
                params![url, id],
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

/// Mark the entry's image generation failed.
pub async fn fail_image(db: &Database, id: &str) -> Result<PatchOutcome, SomniaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE dreams SET image_status = 'failed' WHERE id = ?1",
                params![id],
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

/// Entries in `failed` state with a retry budget left and non-empty text,
/// oldest attempt first.
pub async fn list_retryable_images(
    db: &Database,
    max_retries: i64,
) -> Result<Vec<DreamEntry>, SomniaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DREAM_COLUMNS} FROM dreams \
                 WHERE image_status = 'failed' AND image_retry_count < ?1 AND text != '' \
                 ORDER BY image_last_attempt ASC"
            ))?;
            let rows = stmt.query_map(params![max_retries], dream_from_row)?;
            let mut dreams = Vec::new();
            for row in rows {
                dreams.push(row?);
            }
            Ok(dreams)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
