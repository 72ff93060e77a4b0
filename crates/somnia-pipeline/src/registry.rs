// SPDX-FileCopyrightText: 2026 Somnia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity registry: find-or-create catalog upserts for dream entities.
//!
//! The catalog is shared across all users -- a symbol named "ocean" is the
//! same row for everyone, and its reference count tracks lifetime mentions.

use std::sync::Arc;

use somnia_core::types::{EntityKind, EntityRef};
use somnia_core::{SomniaError, StorageAdapter};
use tracing::warn;

use crate::taxonomy::normalize_name;

/// Catalog category assigned when the model provides none.
const DEFAULT_CATEGORY: &str = "uncategorized";

/// One entity occurrence extracted from an analyzed dream.
#[derive(Debug, Clone)]
pub struct EntityMention {
    pub name: String,
    /// Per-occurrence context -- the only field that varies per dream even
    /// when the entity is shared.
    pub context: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl EntityMention {
    pub fn new(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: context.into(),
            description: None,
            category: None,
        }
    }
}

/// Upsert-based reference-counted catalog front-end.
pub struct EntityRegistry {
    storage: Arc<dyn StorageAdapter>,
}

impl EntityRegistry {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Register every mention against the catalog for `kind`.
    ///
    /// Per item: normalize the name, atomically find-or-create the catalog
    /// row (incrementing its reference count), and emit an [`EntityRef`]
    /// preserving input order and per-occurrence context. Mentions whose
    /// name is blank after normalization are skipped.
    pub async fn upsert_many(
        &self,
        kind: EntityKind,
        items: &[EntityMention],
    ) -> Result<Vec<EntityRef>, SomniaError> {
        let mut refs = Vec::with_capacity(items.len());
        for item in items {
            let name = normalize_name(&item.name);
            if name.is_empty() {
                warn!(%kind, "skipping entity mention with blank name");
                continue;
            }
            let description = item
                .description
                .clone()
                .unwrap_or_else(|| default_description(kind).to_string());
            let category = item
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

            let reference_id = self
                .storage
                .upsert_catalog_item(kind, &name, &description, &category)
                .await?;

            refs.push(EntityRef {
                reference_id,
                name,
                context: item.context.clone(),
            });
        }
        Ok(refs)
    }
}

/// Generic fallback description for first mentions without one.
fn default_description(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Symbol => "A recurring image or object appearing in dreams.",
        EntityKind::Archetype => "An archetypal figure appearing in dreams.",
        EntityKind::Emotion => "An emotion experienced within dreams.",
    }
}
