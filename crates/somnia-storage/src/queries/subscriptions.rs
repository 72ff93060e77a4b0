// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only subscription event audit log.

use rusqlite::params;
use somnia_core::SomniaError;
use somnia_core::types::SubscriptionEvent;

use crate::database::Database;

/// Append an audit row. Returns the auto-generated event id.
pub async fn record_event(
    db: &Database,
    user_id: &str,
    event_type: &str,
    payload: Option<&str>,
    created_at: i64,
) -> Result<i64, SomniaError> {
    let user_id = user_id.to_string();
    let event_type = event_type.to_string();
    let payload = payload.map(|p| p.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO subscription_events (user_id, event_type, payload, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, event_type, payload, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All events for a user, in insertion order.
pub async fn list_events(
    db: &Database,
    user_id: &str,
) -> Result<Vec<SubscriptionEvent>, SomniaError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, event_type, payload, created_at \
                 FROM subscription_events WHERE user_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(SubscriptionEvent {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    event_type: row.get(2)?,
                    payload: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
