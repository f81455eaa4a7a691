//! Soft-state cache in front of the resource store.
//!
//! Entries are derived data: losing one only costs a store read. Concurrent
//! writers to the same key resolve last-writer-wins.

mod metrics;

pub use metrics::{CacheMetrics, MetricsReport};

use crate::resource::LocalizationResource;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Prefix shared by every cache key.
pub const CACHE_KEY_PREFIX: &str = "DbLocalizationProviderCache_";

/// Cache key for a resource. Population, lookups and invalidation all go
/// through this one function.
pub fn cache_key(resource_key: &str) -> String {
    format!("{}{}", CACHE_KEY_PREFIX, resource_key)
}

/// Cache key for the available-languages list.
pub fn available_languages_key(include_invariant: bool) -> String {
    cache_key(&format!("AvailableLanguages_{}", include_invariant))
}

/// How the cache is seeded after a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePopulation {
    /// Insert every resource up front
    Eager,
    /// Remember which keys exist; load values on first read
    Lazy,
}

impl CachePopulation {
    pub fn from_flag(populate_on_startup: bool) -> Self {
        if populate_on_startup {
            CachePopulation::Eager
        } else {
            CachePopulation::Lazy
        }
    }
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Resource(LocalizationResource),
    Languages(Vec<String>),
}

#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: DashMap<String, CacheEntry>,
    /// Replaced wholesale on population so readers never see a half-built set
    known_keys: RwLock<HashSet<String>>,
    metrics: CacheMetrics,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_resource(&self, resource_key: &str) -> Option<LocalizationResource> {
        let found = match self.entries.get(&cache_key(resource_key)).as_deref() {
            Some(CacheEntry::Resource(resource)) => Some(resource.clone()),
            _ => None,
        };

        match found {
            Some(_) => self.metrics.record_hit(),
            None => self.metrics.record_miss(),
        }
        found
    }

    pub fn insert_resource(&self, resource: LocalizationResource) {
        self.entries.insert(
            cache_key(&resource.resource_key),
            CacheEntry::Resource(resource),
        );
    }

    pub fn get_languages(&self, include_invariant: bool) -> Option<Vec<String>> {
        match self
            .entries
            .get(&available_languages_key(include_invariant))
            .as_deref()
        {
            Some(CacheEntry::Languages(languages)) => Some(languages.clone()),
            _ => None,
        }
    }

    pub fn insert_languages(&self, include_invariant: bool, languages: Vec<String>) {
        self.entries.insert(
            available_languages_key(include_invariant),
            CacheEntry::Languages(languages),
        );
    }

    /// Drop everything derived from one resource: its entry and the language
    /// lists it may have contributed to.
    pub fn invalidate_resource(&self, resource_key: &str) {
        self.entries.remove(&cache_key(resource_key));
        self.entries.remove(&available_languages_key(true));
        self.entries.remove(&available_languages_key(false));
        self.metrics.record_invalidation();
        debug!("Invalidated cache for {}", resource_key);
    }

    pub fn forget_known_key(&self, resource_key: &str) {
        self.write_known_keys().remove(resource_key);
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.write_known_keys().clear();
    }

    pub fn store_known_key(&self, resource_key: &str) {
        self.write_known_keys().insert(resource_key.to_string());
    }

    pub fn is_known_key(&self, resource_key: &str) -> bool {
        self.read_known_keys().contains(resource_key)
    }

    /// Whether lookups can trust the known-key set to rule out missing keys.
    pub fn tracks_known_keys(&self) -> bool {
        !self.read_known_keys().is_empty()
    }

    /// `true` when known keys are tracked and `resource_key` is not among
    /// them. Checked under a single read so a concurrent population cannot
    /// split the two questions.
    pub fn rules_out(&self, resource_key: &str) -> bool {
        let known = self.read_known_keys();
        !known.is_empty() && !known.contains(resource_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn report(&self) -> MetricsReport {
        self.metrics
            .report(self.entries.len(), self.read_known_keys().len())
    }

    /// Seed the cache from the result of a sync pass.
    ///
    /// The known-key set is swapped in one step, and eager entries are written
    /// before stale ones are dropped, so a lookup racing a repopulation never
    /// sees a key that exists on both sides of the pass as missing.
    pub fn populate(&self, mode: CachePopulation, resources: &[LocalizationResource]) {
        let keys: HashSet<String> = resources.iter().map(|r| r.resource_key.clone()).collect();

        match mode {
            CachePopulation::Eager => {
                for resource in resources {
                    self.insert_resource(resource.clone());
                }
                *self.write_known_keys() = HashSet::new();
                self.entries.retain(|_, entry| match entry {
                    CacheEntry::Resource(resource) => keys.contains(&resource.resource_key),
                    CacheEntry::Languages(_) => false,
                });
            }
            CachePopulation::Lazy => {
                *self.write_known_keys() = keys;
                self.entries.clear();
            }
        }
        debug!("Cache populated ({:?}) with {} resources", mode, resources.len());
    }

    fn read_known_keys(&self) -> RwLockReadGuard<'_, HashSet<String>> {
        self.known_keys.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_known_keys(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        self.known_keys.write().unwrap_or_else(PoisonError::into_inner)
    }
}
