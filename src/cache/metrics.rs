//! Cache hit/miss counters.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters owned by one [`ResourceCache`](super::ResourceCache).
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicUsize,
    misses: AtomicUsize,
    /// Lookups answered "not found" from the known-key set without a store read
    known_key_rejections: AtomicUsize,
    invalidations: AtomicUsize,
}

impl CacheMetrics {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_known_key_rejection(&self) {
        self.known_key_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn known_key_rejections(&self) -> usize {
        self.known_key_rejections.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters plus the sizes supplied by the cache.
    pub fn report(&self, entries: usize, known_keys: usize) -> MetricsReport {
        let hits = self.hits();
        let misses = self.misses();
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            hits,
            misses,
            hit_rate,
            known_key_rejections: self.known_key_rejections(),
            invalidations: self.invalidations(),
            entries,
            known_keys,
        }
    }
}

/// Serializable cache statistics, exposed on the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub hits: usize,
    pub misses: usize,
    /// Percentage (0-100)
    pub hit_rate: f64,
    pub known_key_rejections: usize,
    pub invalidations: usize,
    pub entries: usize,
    pub known_keys: usize,
}
