// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable task queue operations for background jobs.
//!
//! Analysis, synthesis, and image jobs are enqueued by the save path and
//! drained at-least-once by the worker. Dequeue atomically claims the
//! oldest pending entry inside a transaction.

use rusqlite::params;
use somnia_core::SomniaError;
use somnia_core::types::QueueEntry;

use crate::database::Database;

fn entry_from_row(row: &rusqlite::Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        payload: row.get(2)?,
        status: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        locked_until: row.get(8)?,
    })
}

/// Enqueue a new job. Returns the auto-generated queue entry id.
pub async fn enqueue(db: &Database, queue_name: &str, payload: &str) -> Result<i64, SomniaError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload) VALUES (?1, ?2)",
                params![queue_name, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim the next pending entry from the named queue.
///
/// Atomically selects the oldest pending entry and marks it `processing`
/// with a 5-minute lock timeout. Returns `None` if the queue is empty.
pub async fn dequeue(db: &Database, queue_name: &str) -> Result<Option<QueueEntry>, SomniaError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let claimed = {
                let mut stmt = tx.prepare(
                    "SELECT id, queue_name, payload, status, attempts, max_attempts, \
                            created_at, updated_at, locked_until \
                     FROM queue \
                     WHERE queue_name = ?1 AND status = 'pending' \
                     ORDER BY id ASC \
                     LIMIT 1",
                )?;
                match stmt.query_row(params![queue_name], entry_from_row) {
                    Ok(entry) => Some(entry),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let result = match claimed {
                Some(entry) => {
                    tx.execute(
                        "UPDATE queue SET status = 'processing', \
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'), \
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                         WHERE id = ?1",
                        params![entry.id],
                    )?;
                    Some(QueueEntry {
                        status: "processing".to_string(),
                        ..entry
                    })
                }
                None => None,
            };
            tx.commit()?;
            Ok(result)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful processing: marks the entry `completed`.
pub async fn ack(db: &Database, id: i64) -> Result<(), SomniaError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed', \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed attempt.
///
/// Increments `attempts`; below `max_attempts` the entry returns to
/// `pending` for retry, at the cap it is terminally `failed`.
pub async fn fail(db: &Database, id: i64) -> Result<(), SomniaError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i64, i64) = conn.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let next_status = if new_attempts >= max_attempts { "failed" } else { "pending" };
            conn.execute(
                "UPDATE queue SET status = ?1, attempts = ?2, locked_until = NULL, \
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
                 WHERE id = ?3",
                params![next_status, new_attempts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
