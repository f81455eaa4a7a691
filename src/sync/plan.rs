//! Turns discovered resources into batched store operations.
//!
//! Each batch covers a disjoint group of resource keys, so batches can be
//! applied concurrently and retried independently.

use crate::resource::{
    DiscoveredResource, LocalizationResource, Translation, AUTHOR_TYPE_SCANNER, INVARIANT_CULTURE,
};
use super::merge::resolve_renames;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Resources per batch when the configuration does not say otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 400;

/// One parameterized store instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOperation {
    /// Re-key a stored resource; skipped when `old_key` is gone or `new_key` is taken
    Rename { old_key: String, new_key: String },
    /// Create a resource; degrades to an update when the key already exists
    Insert { resource: LocalizationResource },
    /// Mark an existing resource as synced from code and upsert translations
    Update {
        key: String,
        is_hidden: bool,
        translations: Vec<Translation>,
    },
}

impl SyncOperation {
    pub fn key(&self) -> &str {
        match self {
            SyncOperation::Rename { new_key, .. } => new_key,
            SyncOperation::Insert { resource } => &resource.resource_key,
            SyncOperation::Update { key, .. } => key,
        }
    }
}

/// A group of operations applied in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncBatch {
    pub index: usize,
    pub operations: Vec<SyncOperation>,
}

impl SyncBatch {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn inserts(&self) -> usize {
        self.count(|op| matches!(op, SyncOperation::Insert { .. }))
    }

    pub fn updates(&self) -> usize {
        self.count(|op| matches!(op, SyncOperation::Update { .. }))
    }

    pub fn renames(&self) -> usize {
        self.count(|op| matches!(op, SyncOperation::Rename { .. }))
    }

    fn count(&self, predicate: impl Fn(&SyncOperation) -> bool) -> usize {
        self.operations.iter().filter(|op| predicate(op)).count()
    }
}

/// Plan the store operations for a sync pass.
///
/// `stored` is the snapshot read before the pass. Renames are resolved against
/// it exactly as the merge does, and Insert or Update is chosen from the
/// post-rename view, so the store ends up holding the merged set. A renamed
/// resource travels in the same batch as any new declaration of the key it
/// vacates, which keeps the rename ahead of that insert.
pub fn plan_batches(
    discovered: &[DiscoveredResource],
    stored: &[LocalizationResource],
    batch_size: usize,
    now: DateTime<Utc>,
) -> Vec<SyncBatch> {
    let batch_size = batch_size.max(1);
    let index: HashMap<&str, &LocalizationResource> = stored
        .iter()
        .map(|r| (r.resource_key.as_str(), r))
        .collect();

    let renames = resolve_renames(stored, discovered);
    let source_of: HashMap<&str, &str> = renames
        .iter()
        .map(|(old_key, new_key)| (new_key.as_str(), old_key.as_str()))
        .collect();
    let vacated: HashMap<&str, &str> = renames
        .iter()
        .map(|(old_key, new_key)| (old_key.as_str(), new_key.as_str()))
        .collect();

    let lookup = |key: &str| {
        match source_of.get(key) {
            Some(old_key) => index.get(old_key).copied(),
            None if vacated.contains_key(key) => None,
            None => index.get(key).copied(),
        }
    };

    // Group each vacated key's new declaration with the resource renamed away
    // from it; every other resource stands alone.
    let mut units: Vec<Vec<&DiscoveredResource>> = Vec::new();
    let mut unit_of_target: HashMap<&str, usize> = HashMap::new();
    for resource in discovered.iter().filter(|r| !vacated.contains_key(r.key.as_str())) {
        if source_of.contains_key(resource.key.as_str()) {
            unit_of_target.insert(resource.key.as_str(), units.len());
        }
        units.push(vec![resource]);
    }
    for resource in discovered {
        let Some(target) = vacated.get(resource.key.as_str()) else {
            continue;
        };
        match unit_of_target.get(target) {
            Some(&unit) => units[unit].push(resource),
            None => units.push(vec![resource]),
        }
    }

    let mut groups: Vec<Vec<&DiscoveredResource>> = Vec::new();
    for unit in units {
        match groups.last_mut() {
            Some(group) if group.len() + unit.len() <= batch_size => group.extend(unit),
            _ => groups.push(unit),
        }
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(batch_index, group)| {
            let mut operations: Vec<SyncOperation> = group
                .iter()
                .filter_map(|r| {
                    source_of.get(r.key.as_str()).map(|old_key| SyncOperation::Rename {
                        old_key: old_key.to_string(),
                        new_key: r.key.clone(),
                    })
                })
                .collect();

            for resource in group {
                operations.push(match lookup(resource.key.as_str()) {
                    Some(existing) => plan_update(existing, resource),
                    None => plan_insert(resource, now),
                });
            }

            SyncBatch {
                index: batch_index,
                operations,
            }
        })
        .collect()
}

fn plan_insert(discovered: &DiscoveredResource, now: DateTime<Utc>) -> SyncOperation {
    let mut resource = discovered.to_resource();
    resource.author = AUTHOR_TYPE_SCANNER.to_string();
    resource.modification_date = now;
    SyncOperation::Insert { resource }
}

fn plan_update(existing: &LocalizationResource, discovered: &DiscoveredResource) -> SyncOperation {
    let mut translations = Vec::new();

    // The invariant text always follows code, even for edited resources.
    if let Some(invariant) = discovered.invariant() {
        if needs_write(existing, INVARIANT_CULTURE, &invariant.translation) {
            translations.push(Translation::new(INVARIANT_CULTURE, &invariant.translation));
        }
    }

    if !existing.is_modified() {
        for t in discovered.translations.iter().filter(|t| t.culture != INVARIANT_CULTURE) {
            if needs_write(existing, &t.culture, &t.translation) {
                upsert(&mut translations, &t.culture, &t.translation);
            }
        }
    }

    SyncOperation::Update {
        key: discovered.key.clone(),
        is_hidden: discovered.is_hidden,
        translations,
    }
}

fn needs_write(existing: &LocalizationResource, culture: &str, value: &str) -> bool {
    existing
        .translation(culture)
        .map_or(true, |current| current.value != value)
}

fn upsert(translations: &mut Vec<Translation>, culture: &str, value: &str) {
    match translations.iter_mut().find(|t| t.culture == culture) {
        Some(existing) => existing.value = value.to_string(),
        None => translations.push(Translation::new(culture, value)),
    }
}
