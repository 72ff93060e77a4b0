// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity catalog operations over the three taxonomy tables.
//!
//! The tables (symbols, archetypes, emotions) are structurally identical;
//! every function is parameterized by [`EntityKind`], which supplies the
//! table name. Table names come from a closed enum, never from input.

use rusqlite::params;
use somnia_core::SomniaError;
use somnia_core::types::{CatalogItem, EntityKind};

use crate::database::Database;

fn item_from_row(row: &rusqlite::Row<'_>) -> Result<CatalogItem, rusqlite::Error> {
    Ok(CatalogItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        references: row.get(4)?,
    })
}

/// Atomic find-or-create by normalized name.
///
/// First mention inserts a fresh row with `ref_count = 1`; every later
/// mention increments the existing row's count in the same statement. The
/// UNIQUE constraint on `name` makes concurrent first mentions converge on
/// one row instead of racing into duplicates.
pub async fn upsert_item(
    db: &Database,
    kind: EntityKind,
    name: &str,
    description: &str,
    category: &str,
) -> Result<String, SomniaError> {
    let name = name.to_string();
    let description = description.to_string();
    let category = category.to_string();
    let id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "INSERT INTO {} (id, name, description, category, ref_count) \
                 VALUES (?1, ?2, ?3, ?4, 1) \
                 ON CONFLICT(name) DO UPDATE SET ref_count = ref_count + 1 \
                 RETURNING id",
                kind.table()
            );
            let returned: String =
                conn.query_row(&sql, params![id, name, description, category], |row| {
                    row.get(0)
                })?;
            Ok(returned)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Batch-fetch catalog rows by id. Unknown ids are simply absent from the
/// result; callers null-filter.
pub async fn get_items(
    db: &Database,
    kind: EntityKind,
    ids: &[String],
) -> Result<Vec<CatalogItem>, SomniaError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!(
                "SELECT id, name, description, category, ref_count FROM {} WHERE id IN ({})",
                kind.table(),
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), item_from_row)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a catalog row by its normalized name.
pub async fn get_item_by_name(
    db: &Database,
    kind: EntityKind,
    name: &str,
) -> Result<Option<CatalogItem>, SomniaError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT id, name, description, category, ref_count FROM {} WHERE name = ?1",
                kind.table()
            );
            let mut stmt = conn.prepare(&sql)?;
            match stmt.query_row(params![name], item_from_row) {
                Ok(item) => Ok(Some(item)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn first_mention_inserts_with_count_one() {
        let (db, _dir) = setup_db().await;
        let id = upsert_item(&db, EntityKind::Symbol, "ocean", "Vast water.", "nature")
            .await
            .unwrap();

        let item = get_item_by_name(&db, EntityKind::Symbol, "ocean").await.unwrap().unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.references, 1);
        assert_eq!(item.category, "nature");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeat_mentions_increment_and_reuse_id() {
        let (db, _dir) = setup_db().await;
        let first = upsert_item(&db, EntityKind::Symbol, "ocean", "Vast water.", "nature")
            .await
            .unwrap();
        let second = upsert_item(&db, EntityKind::Symbol, "ocean", "ignored", "ignored")
            .await
            .unwrap();
        assert_eq!(first, second, "conflict must reuse the existing id");

        let item = get_item_by_name(&db, EntityKind::Symbol, "ocean").await.unwrap().unwrap();
        assert_eq!(item.references, 2);
        // Description and category from the first mention stick.
        assert_eq!(item.description, "Vast water.");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn kinds_are_isolated_tables() {
        let (db, _dir) = setup_db().await;
        upsert_item(&db, EntityKind::Symbol, "shadow", "d", "c").await.unwrap();
        upsert_item(&db, EntityKind::Archetype, "shadow", "d", "c").await.unwrap();

        let symbol = get_item_by_name(&db, EntityKind::Symbol, "shadow").await.unwrap().unwrap();
        let archetype = get_item_by_name(&db, EntityKind::Archetype, "shadow")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(symbol.id, archetype.id);
        assert_eq!(symbol.references, 1);
        assert_eq!(archetype.references, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_items_batch_fetch_skips_unknown_ids() {
        let (db, _dir) = setup_db().await;
        let a = upsert_item(&db, EntityKind::Emotion, "awe", "d", "c").await.unwrap();
        let b = upsert_item(&db, EntityKind::Emotion, "dread", "d", "c").await.unwrap();

        let ids = vec![a.clone(), b.clone(), "no-such-id".to_string()];
        let items = get_items(&db, EntityKind::Emotion, &ids).await.unwrap();
        assert_eq!(items.len(), 2);

        let empty = get_items(&db, EntityKind::Emotion, &[]).await.unwrap();
        assert!(empty.is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_first_mentions_converge_on_one_row() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                upsert_item(&db, EntityKind::Symbol, "mirror", "d", "c").await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "all upserts must land on one catalog row");

        let item = get_item_by_name(&db, EntityKind::Symbol, "mirror").await.unwrap().unwrap();
        assert_eq!(item.references, 10);
        db.close().await.unwrap();
    }
}
