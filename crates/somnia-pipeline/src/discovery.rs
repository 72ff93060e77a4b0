// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery aggregator: per-user entity tallies joined with catalog rows.
//!
//! Read-only and computed on demand. Tallies are keyed by `reference_id`,
//! not name, so two catalog rows that happen to share a display name are
//! counted separately. The returned count is the user-local one; the
//! catalog's global count is deliberately not exposed here.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use somnia_core::types::{DreamEntry, EntityKind, EntityRef};
use somnia_core::{SomniaError, StorageAdapter};

/// One entity a user has personally encountered, with their local count.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredEntity {
    pub reference_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    /// How many times this user's dreams reference the entity.
    pub count: i64,
}

/// A user's discovered entities across all three taxonomies.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Discoveries {
    pub symbols: Vec<DiscoveredEntity>,
    pub archetypes: Vec<DiscoveredEntity>,
    pub emotions: Vec<DiscoveredEntity>,
}

impl Discoveries {
    /// Combined view across taxonomies, sorted by user-local count
    /// descending. Display ordering beyond that is up to the caller.
    pub fn combined_by_count(&self) -> Vec<&DiscoveredEntity> {
        let mut all: Vec<&DiscoveredEntity> = self
            .symbols
            .iter()
            .chain(self.archetypes.iter())
            .chain(self.emotions.iter())
            .collect();
        all.sort_by(|a, b| b.count.cmp(&a.count));
        all
    }
}

/// Computes per-user discovery views by scanning dream entity lists.
pub struct DiscoveryAggregator {
    storage: Arc<dyn StorageAdapter>,
}

impl DiscoveryAggregator {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Scan every dream of `user_id`, tally references per distinct catalog
    /// id, and join against the catalog for metadata. Ids the catalog no
    /// longer contains are dropped silently.
    pub async fn get_user_discoveries(&self, user_id: &str) -> Result<Discoveries, SomniaError> {
        let dreams = self.storage.list_dreams(user_id).await?;

        Ok(Discoveries {
            symbols: self.resolve(EntityKind::Symbol, tally(&dreams, |d| &d.symbols)).await?,
            archetypes: self
                .resolve(EntityKind::Archetype, tally(&dreams, |d| &d.archetypes))
                .await?,
            emotions: self.resolve(EntityKind::Emotion, tally(&dreams, |d| &d.emotions)).await?,
        })
    }

    async fn resolve(
        &self,
        kind: EntityKind,
        counts: HashMap<String, i64>,
    ) -> Result<Vec<DiscoveredEntity>, SomniaError> {
        if counts.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = counts.keys().cloned().collect();
        let items = self.storage.get_catalog_items(kind, &ids).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| {
                counts.get(&item.id).map(|&count| DiscoveredEntity {
                    reference_id: item.id,
                    name: item.name,
                    description: item.description,
                    category: item.category,
                    count,
                })
            })
            .collect())
    }
}

/// Occurrence counts per distinct reference id across all of a user's dreams.
fn tally(dreams: &[DreamEntry], pick: fn(&DreamEntry) -> &[EntityRef]) -> HashMap<String, i64> {
    let mut counts = HashMap::new();
    for dream in dreams {
        for entity in pick(dream) {
            *counts.entry(entity.reference_id.clone()).or_insert(0) += 1;
        }
    }
    counts
}
