//! Reconciles code-discovered resources with the stored resource set.
//!
//! Code is the source of truth for a resource until a human edits it. After
//! that only the invariant translation keeps tracking code; every other
//! culture belongs to the translators.

use crate::resource::{DiscoveredResource, LocalizationResource, INVARIANT_CULTURE};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Merge discovered resources into the stored set.
///
/// Pure: neither input is mutated and storage is never touched. The result is
/// ordered by resource key.
pub fn merge(
    stored: &[LocalizationResource],
    discovered: &[DiscoveredResource],
) -> Vec<LocalizationResource> {
    merge_at(stored, discovered, Utc::now())
}

/// [`merge`] with an explicit creation timestamp for newly inserted resources.
pub fn merge_at(
    stored: &[LocalizationResource],
    discovered: &[DiscoveredResource],
    now: DateTime<Utc>,
) -> Vec<LocalizationResource> {
    // A scan that found nothing (or nothing to reconcile against) must never
    // wipe or reshape what is stored.
    if stored.is_empty() || discovered.is_empty() {
        return stored.to_vec();
    }

    let mut index: BTreeMap<String, LocalizationResource> = stored
        .iter()
        .map(|r| (r.resource_key.clone(), r.clone()))
        .collect();

    for (old_key, new_key) in resolve_renames(stored, discovered) {
        if let Some(mut renamed) = index.remove(&old_key) {
            debug!("Renaming resource {} -> {}", old_key, new_key);
            renamed.resource_key = new_key.clone();
            renamed.from_code = true;
            index.insert(new_key, renamed);
        }
    }

    for resource in discovered {
        match index.get_mut(&resource.key) {
            None => {
                let mut created = resource.to_resource();
                created.modification_date = now;
                index.insert(resource.key.clone(), created);
            }
            Some(existing) => {
                existing.from_code = true;
                existing.is_hidden = resource.is_hidden;
                if existing.is_modified() {
                    refresh_invariant(existing, resource);
                } else {
                    refresh_all(existing, resource);
                }
            }
        }
    }

    index.into_values().collect()
}

/// The renames a pass applies, as `(old_key, new_key)` pairs ordered by new
/// key.
///
/// Every rename is judged against the stored snapshot alone: the old key must
/// be stored and the new key must not be. When several resources claim the
/// same old key, the smallest new key takes it. The result is the same for
/// any ordering of `discovered`, and no accepted source is another accepted
/// rename's target.
pub fn resolve_renames(
    stored: &[LocalizationResource],
    discovered: &[DiscoveredResource],
) -> Vec<(String, String)> {
    let stored_keys: HashSet<&str> = stored.iter().map(|r| r.resource_key.as_str()).collect();

    let mut candidates: Vec<(&str, &str)> = discovered
        .iter()
        .filter_map(|r| r.rename_source().map(|old_key| (old_key, r.key.as_str())))
        .filter(|(old_key, new_key)| {
            old_key != new_key && stored_keys.contains(old_key) && !stored_keys.contains(new_key)
        })
        .collect();
    candidates.sort_unstable_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)));

    let mut sources = HashSet::new();
    let mut targets = HashSet::new();
    let mut renames = Vec::new();
    for (old_key, new_key) in candidates {
        if sources.contains(old_key) || targets.contains(new_key) {
            continue;
        }
        sources.insert(old_key);
        targets.insert(new_key);
        renames.push((old_key.to_string(), new_key.to_string()));
    }
    renames
}

fn refresh_all(existing: &mut LocalizationResource, discovered: &DiscoveredResource) {
    for t in &discovered.translations {
        existing.set_translation(&t.culture, &t.translation);
    }
}

fn refresh_invariant(existing: &mut LocalizationResource, discovered: &DiscoveredResource) {
    if let Some(invariant) = discovered.invariant() {
        existing.set_translation(INVARIANT_CULTURE, &invariant.translation);
    }
}
