//! Resource synchronization: bring the store in line with what code declares.
//!
//! A pass runs in this order:
//! 1. both discovery scans, concurrently (`discovery`)
//! 2. reset of the from-code flags in the store
//! 3. planning of per-batch store operations (`plan`)
//! 4. concurrent persistence of the batches, each retried on its own
//! 5. merge of the stored snapshot with the discovered set (`merge`)
//! 6. cache population from the persisted set, checked against the merge

pub mod discovery;
pub mod merge;
pub mod plan;

use crate::cache::{CachePopulation, ResourceCache};
use crate::db::is_retryable_store_error;
use crate::resource::{DiscoveredResource, LocalizationResource, ManualResource, AUTHOR_MANUAL};
use crate::retry::{with_retry_if, RetryConfig};
use crate::store::ResourceStore;
use anyhow::{Context, Result};
use chrono::Utc;
use discovery::{discover_all, Discoverer, Discovery};
use futures::future::join_all;
use plan::{plan_batches, SyncBatch, SyncOperation, DEFAULT_BATCH_SIZE};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settings consumed by [`ResourceSynchronizer`], taken from `Config`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub discover_and_register: bool,
    pub batch_size: usize,
    pub cache_population: CachePopulation,
    /// Culture that manually registered resources are written in
    pub default_culture: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            discover_and_register: true,
            batch_size: DEFAULT_BATCH_SIZE,
            cache_population: CachePopulation::Eager,
            default_culture: "en".to_string(),
        }
    }
}

/// Outcome of a sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// `false` when the pass was disabled or discovery found nothing
    pub ran: bool,
    pub discovered: usize,
    pub inserted: usize,
    pub updated: usize,
    pub renamed: usize,
    /// Indexes of batches that still failed after retrying
    pub failed_batches: Vec<usize>,
    /// Keys declared by both discovery scans
    pub duplicate_keys: Vec<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

pub struct ResourceSynchronizer {
    store: Arc<dyn ResourceStore>,
    cache: Arc<ResourceCache>,
    config: SyncConfig,
    retry: RetryConfig,
}

impl ResourceSynchronizer {
    pub fn new(store: Arc<dyn ResourceStore>, cache: Arc<ResourceCache>, config: SyncConfig) -> Self {
        Self {
            store,
            cache,
            config,
            retry: RetryConfig::batch_persist(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run a full sync pass: discover, persist, merge, populate the cache.
    ///
    /// A failing batch does not abort the pass; it is listed in the report.
    /// Errors are returned only for failed discovery or an unreachable store.
    pub async fn discover_and_register(
        &self,
        resources: Arc<dyn Discoverer>,
        models: Arc<dyn Discoverer>,
    ) -> Result<SyncReport> {
        if !self.config.discover_and_register {
            info!("Resource discovery disabled, skipping sync");
            return Ok(SyncReport::default());
        }

        let discovery = discover_all(resources, models).await?;
        self.register(discovery).await
    }

    /// Persist an already-combined discovery result. Split out of
    /// [`discover_and_register`](Self::discover_and_register) so callers with
    /// their own scans can feed it directly.
    pub async fn register(&self, discovery: Discovery) -> Result<SyncReport> {
        let Discovery {
            resources: discovered,
            duplicate_keys,
        } = discovery;

        if discovered.is_empty() {
            warn!("Discovery found no resources, leaving the store untouched");
            return Ok(SyncReport {
                duplicate_keys,
                ..SyncReport::default()
            });
        }

        let reset = self
            .store
            .reset_sync_status()
            .await
            .context("Failed to reset sync status")?;
        debug!("Reset from-code flag on {} resources", reset);

        let stored = self
            .store
            .get_all_resources()
            .await
            .context("Failed to load stored resources")?;

        let now = Utc::now();
        let batches = plan_batches(&discovered, &stored, self.config.batch_size, now);
        info!(
            "Syncing {} discovered resources against {} stored in {} batches",
            discovered.len(),
            stored.len(),
            batches.len()
        );

        let mut report = self.persist(&batches).await;
        report.discovered = discovered.len();
        report.duplicate_keys = duplicate_keys;

        let merged = merge::merge_at(&stored, &discovered, now);
        // The store assigns ids and owns the from-code flags, so the cache is
        // seeded from what actually landed.
        let persisted = self
            .store
            .get_all_resources()
            .await
            .context("Failed to reload resources after sync")?;
        // An empty store short-circuits the merge, and failed batches never
        // landed; neither case can be compared.
        if report.is_complete() && !stored.is_empty() {
            let drifted = drifted_keys(&merged, &persisted);
            if !drifted.is_empty() {
                warn!("Store disagrees with the merged set on keys {:?}", drifted);
            }
        }
        self.cache.populate(self.config.cache_population, &persisted);

        if report.is_complete() {
            info!(
                "✓ Sync complete: {} inserted, {} updated, {} renamed",
                report.inserted, report.updated, report.renamed
            );
        } else {
            warn!(
                "Sync finished with {} failed batches: {:?}",
                report.failed_batches.len(),
                report.failed_batches
            );
        }

        Ok(report)
    }

    /// Register resources declared outside any scan. Existing resources only
    /// get their invariant text refreshed, plus the default-culture text when
    /// nobody has edited them.
    pub async fn register_manually(&self, resources: &[ManualResource]) -> Result<SyncReport> {
        if resources.is_empty() {
            return Ok(SyncReport::default());
        }

        let discovered: Vec<DiscoveredResource> = resources
            .iter()
            .map(|r| r.to_discovered(&self.config.default_culture))
            .collect();
        let stored = self
            .store
            .get_all_resources()
            .await
            .context("Failed to load stored resources")?;

        let mut batches = plan_batches(&discovered, &stored, self.config.batch_size, Utc::now());
        for operation in batches.iter_mut().flat_map(|b| b.operations.iter_mut()) {
            if let SyncOperation::Insert { resource } = operation {
                resource.author = AUTHOR_MANUAL.to_string();
            }
        }

        let mut report = self.persist(&batches).await;
        report.discovered = discovered.len();

        for resource in &discovered {
            self.cache.invalidate_resource(&resource.key);
            if self.cache.tracks_known_keys() {
                self.cache.store_known_key(&resource.key);
            }
        }

        info!("Registered {} manual resources", resources.len());
        Ok(report)
    }

    /// Apply every batch concurrently. Batches touch disjoint keys, so the
    /// final state does not depend on which finishes first.
    async fn persist(&self, batches: &[SyncBatch]) -> SyncReport {
        let outcomes = join_all(
            batches
                .iter()
                .filter(|batch| !batch.is_empty())
                .map(|batch| async move {
                    let name = format!("Sync batch {}", batch.index);
                    let result = with_retry_if(
                        &self.retry,
                        &name,
                        || self.store.apply_batch(batch),
                        is_retryable_store_error,
                    )
                    .await;
                    (batch, result)
                }),
        )
        .await;

        let mut report = SyncReport {
            ran: true,
            ..SyncReport::default()
        };
        for (batch, result) in outcomes {
            match result {
                Ok(()) => {
                    debug!(
                        "Batch {} applied: {} inserts, {} updates, {} renames",
                        batch.index,
                        batch.inserts(),
                        batch.updates(),
                        batch.renames()
                    );
                    report.inserted += batch.inserts();
                    report.updated += batch.updates();
                    report.renamed += batch.renames();
                }
                Err(e) => {
                    warn!("Batch {} failed: {:#}", batch.index, e);
                    report.failed_batches.push(batch.index);
                }
            }
        }
        report.failed_batches.sort_unstable();
        report
    }

    /// Plan a pass against the current store without applying anything.
    pub async fn preview(&self, discovered: &[DiscoveredResource]) -> Result<Vec<SyncBatch>> {
        let stored: Vec<LocalizationResource> = self.store.get_all_resources().await?;
        Ok(plan_batches(discovered, &stored, self.config.batch_size, Utc::now()))
    }
}

/// Keys present in only one of the two sets.
fn drifted_keys(merged: &[LocalizationResource], persisted: &[LocalizationResource]) -> Vec<String> {
    let merged: BTreeSet<&str> = merged.iter().map(|r| r.resource_key.as_str()).collect();
    let persisted: BTreeSet<&str> = persisted.iter().map(|r| r.resource_key.as_str()).collect();
    merged
        .symmetric_difference(&persisted)
        .map(|key| key.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::INVARIANT_CULTURE;
    use crate::store::MemoryResourceStore;
    use discovery::StaticDiscoverer;
    use proptest::prelude::*;
    use std::time::Duration;

    fn fast_retry() -> RetryConfig {
        RetryConfig::new(3, Duration::ZERO)
    }

    fn synchronizer(
        store: Arc<MemoryResourceStore>,
        config: SyncConfig,
    ) -> (ResourceSynchronizer, Arc<ResourceCache>) {
        let cache = Arc::new(ResourceCache::new());
        let sync = ResourceSynchronizer::new(store, Arc::clone(&cache), config)
            .with_retry_config(fast_retry());
        (sync, cache)
    }

    fn scan(name: &str, resources: Vec<DiscoveredResource>) -> Arc<dyn Discoverer> {
        Arc::new(StaticDiscoverer::new(name, resources))
    }

    fn discovered(key: &str, invariant: &str) -> DiscoveredResource {
        DiscoveredResource::new(key).with_translation(INVARIANT_CULTURE, invariant)
    }

    // ==================== Discover And Register Tests ====================

    #[tokio::test]
    async fn test_disabled_sync_does_nothing() {
        let store = Arc::new(MemoryResourceStore::new());
        let config = SyncConfig {
            discover_and_register: false,
            ..SyncConfig::default()
        };
        let (sync, _) = synchronizer(Arc::clone(&store), config);

        let report = sync
            .discover_and_register(scan("resources", vec![discovered("A", "a")]), scan("models", vec![]))
            .await
            .unwrap();

        assert!(!report.ran);
        assert!(store.get_all_resources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_discovery_leaves_store_untouched() {
        let mut existing = LocalizationResource::new("Keep").with_translation("", "kept");
        existing.from_code = true;
        let store = Arc::new(MemoryResourceStore::with_resources(vec![existing]));
        let (sync, _) = synchronizer(Arc::clone(&store), SyncConfig::default());

        let report = sync
            .discover_and_register(scan("resources", vec![]), scan("models", vec![]))
            .await
            .unwrap();

        assert!(!report.ran);
        let stored = store.get_all_resources().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].from_code);
    }

    #[tokio::test]
    async fn test_first_sync_inserts_and_populates_cache() {
        let store = Arc::new(MemoryResourceStore::new());
        let (sync, cache) = synchronizer(Arc::clone(&store), SyncConfig::default());

        let report = sync
            .discover_and_register(
                scan("resources", vec![discovered("A", "a")]),
                scan("models", vec![discovered("B", "b")]),
            )
            .await
            .unwrap();

        assert!(report.ran);
        assert_eq!(report.discovered, 2);
        assert_eq!(report.inserted, 2);
        assert!(report.is_complete());
        assert_eq!(store.get_all_resources().await.unwrap().len(), 2);
        assert!(cache.get_resource("A").is_some());
        assert!(cache.get_resource("B").is_some());
    }

    #[tokio::test]
    async fn test_resources_no_longer_in_code_lose_from_code_flag() {
        let store = Arc::new(MemoryResourceStore::new());
        let (sync, _) = synchronizer(Arc::clone(&store), SyncConfig::default());

        sync.discover_and_register(
            scan("resources", vec![discovered("Old", "o"), discovered("Kept", "k")]),
            scan("models", vec![]),
        )
        .await
        .unwrap();
        sync.discover_and_register(scan("resources", vec![discovered("Kept", "k")]), scan("models", vec![]))
            .await
            .unwrap();

        let old = store.get_resource("Old").await.unwrap().unwrap();
        let kept = store.get_resource("Kept").await.unwrap().unwrap();
        assert!(!old.from_code);
        assert!(kept.from_code);
    }

    #[tokio::test]
    async fn test_duplicate_keys_are_reported() {
        let store = Arc::new(MemoryResourceStore::new());
        let (sync, _) = synchronizer(Arc::clone(&store), SyncConfig::default());

        let report = sync
            .discover_and_register(
                scan("resources", vec![discovered("Same", "plain")]),
                scan("models", vec![discovered("Same", "model")]),
            )
            .await
            .unwrap();

        assert_eq!(report.duplicate_keys, vec!["Same".to_string()]);
        let stored = store.get_resource("Same").await.unwrap().unwrap();
        assert_eq!(stored.value_for("", false), Some("model"));
    }

    #[tokio::test]
    async fn test_failing_batch_is_reported_and_others_commit() {
        let store = Arc::new(MemoryResourceStore::new());
        store.fail_batch(1, 10);
        let config = SyncConfig {
            batch_size: 2,
            ..SyncConfig::default()
        };
        let (sync, _) = synchronizer(Arc::clone(&store), config);

        let resources = (0..5).map(|i| discovered(&format!("K{}", i), "v")).collect();
        let report = sync
            .discover_and_register(scan("resources", resources), scan("models", vec![]))
            .await
            .unwrap();

        assert_eq!(report.failed_batches, vec![1]);
        assert_eq!(report.inserted, 3);
        let keys: Vec<String> = store
            .get_all_resources()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.resource_key)
            .collect();
        assert_eq!(keys, vec!["K0", "K1", "K4"]);
    }

    #[tokio::test]
    async fn test_transient_batch_failure_is_retried() {
        let store = Arc::new(MemoryResourceStore::new());
        store.fail_batch(0, 2);
        let (sync, _) = synchronizer(Arc::clone(&store), SyncConfig::default());

        let report = sync
            .discover_and_register(scan("resources", vec![discovered("A", "a")]), scan("models", vec![]))
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn test_lazy_population_records_known_keys() {
        let store = Arc::new(MemoryResourceStore::new());
        let config = SyncConfig {
            cache_population: CachePopulation::Lazy,
            ..SyncConfig::default()
        };
        let (sync, cache) = synchronizer(Arc::clone(&store), config);

        sync.discover_and_register(scan("resources", vec![discovered("A", "a")]), scan("models", vec![]))
            .await
            .unwrap();

        assert!(cache.is_empty());
        assert!(cache.is_known_key("A"));
    }

    #[tokio::test]
    async fn test_renamed_key_declared_again_is_persisted_and_cached() {
        let edited = LocalizationResource::new("A")
            .with_modified(Some(true))
            .with_translation("", "a")
            .with_translation("no", "redigert");
        let store = Arc::new(MemoryResourceStore::with_resources(vec![edited]));
        let (sync, cache) = synchronizer(Arc::clone(&store), SyncConfig::default());

        let report = sync
            .register(Discovery {
                resources: vec![
                    discovered("B", "a").renamed_from("A"),
                    discovered("A", "fresh"),
                ],
                duplicate_keys: vec![],
            })
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.renamed, 1);
        assert_eq!(report.inserted, 1);

        let persisted = store.get_all_resources().await.unwrap();
        let keys: Vec<&str> = persisted.iter().map(|r| r.resource_key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B"]);
        for resource in &persisted {
            assert_eq!(cache.get_resource(&resource.resource_key).as_ref(), Some(resource));
        }

        let renamed = store.get_resource("B").await.unwrap().unwrap();
        assert_eq!(renamed.value_for("no", false), Some("redigert"));
        let fresh = store.get_resource("A").await.unwrap().unwrap();
        assert_eq!(fresh.value_for("", false), Some("fresh"));
        assert!(!fresh.is_modified());
    }

    #[tokio::test]
    async fn test_cached_resources_match_store_after_renames() {
        let store = Arc::new(MemoryResourceStore::with_resources(vec![
            LocalizationResource::new("A").with_translation("", "a"),
            LocalizationResource::new("Orphan").with_translation("", "o"),
        ]));
        let (sync, cache) = synchronizer(Arc::clone(&store), SyncConfig::default());

        sync.discover_and_register(
            scan("resources", vec![discovered("C", "c").renamed_from("B")]),
            scan("models", vec![discovered("B", "b").renamed_from("A"), discovered("New", "n")]),
        )
        .await
        .unwrap();

        let persisted = store.get_all_resources().await.unwrap();
        assert_eq!(persisted.len(), 4);
        for resource in &persisted {
            let cached = cache.get_resource(&resource.resource_key);
            assert_eq!(cached.as_ref(), Some(resource));
            assert!(resource.id.is_some());
        }
        let orphan = persisted.iter().find(|r| r.resource_key == "Orphan").unwrap();
        assert!(!orphan.from_code);
    }

    #[test]
    fn test_drifted_keys_lists_both_sides() {
        let merged = vec![LocalizationResource::new("A"), LocalizationResource::new("B")];
        let persisted = vec![LocalizationResource::new("B"), LocalizationResource::new("C")];

        assert_eq!(drifted_keys(&merged, &persisted), vec!["A", "C"]);
        assert!(drifted_keys(&merged, &merged).is_empty());
    }

    // ==================== Property Tests ====================

    fn stored_state(store: &MemoryResourceStore) -> Vec<(String, Vec<(String, String)>)> {
        tokio_test::block_on(store.get_all_resources())
            .unwrap()
            .into_iter()
            .map(|r| {
                let mut translations: Vec<_> =
                    r.translations.into_iter().map(|t| (t.culture, t.value)).collect();
                translations.sort();
                (r.resource_key, translations)
            })
            .collect()
    }

    proptest! {
        #[test]
        fn test_batch_size_does_not_change_outcome(
            declared in proptest::collection::btree_map("[A-Z][a-z]{0,6}", "[a-z]{1,8}", 1..30),
            batch_size in 1usize..8,
        ) {
            let resources: Vec<DiscoveredResource> = declared
                .iter()
                .map(|(key, text)| discovered(key, text).with_translation("en", text))
                .collect();

            let run = |batch_size: usize| {
                let store = Arc::new(MemoryResourceStore::new());
                let config = SyncConfig { batch_size, ..SyncConfig::default() };
                let (sync, _) = synchronizer(Arc::clone(&store), config);
                let report = tokio_test::block_on(sync.discover_and_register(
                    scan("resources", resources.clone()),
                    scan("models", vec![]),
                ))
                .unwrap();
                (report.inserted, stored_state(&store))
            };

            let (inserted_single, state_single) = run(DEFAULT_BATCH_SIZE);
            let (inserted_split, state_split) = run(batch_size);

            prop_assert_eq!(inserted_single, declared.len());
            prop_assert_eq!(inserted_split, declared.len());
            prop_assert_eq!(state_single, state_split);
        }
    }

    // ==================== Manual Registration Tests ====================

    #[tokio::test]
    async fn test_register_manually_inserts_with_manual_author() {
        let store = Arc::new(MemoryResourceStore::new());
        let (sync, _) = synchronizer(Arc::clone(&store), SyncConfig::default());

        let report = sync
            .register_manually(&[ManualResource::new("Manual.Key", "Hello")])
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        let stored = store.get_resource("Manual.Key").await.unwrap().unwrap();
        assert_eq!(stored.author, AUTHOR_MANUAL);
        assert_eq!(stored.value_for("", false), Some("Hello"));
        assert_eq!(stored.value_for("en", false), Some("Hello"));
    }

    #[tokio::test]
    async fn test_register_manually_keeps_edited_default_culture() {
        let existing = LocalizationResource::new("Manual.Key")
            .with_translation("", "Old")
            .with_translation("en", "Edited")
            .with_modified(Some(true));
        let store = Arc::new(MemoryResourceStore::with_resources(vec![existing]));
        let (sync, cache) = synchronizer(Arc::clone(&store), SyncConfig::default());
        cache.insert_resource(LocalizationResource::new("Manual.Key"));

        sync.register_manually(&[ManualResource::new("Manual.Key", "New")])
            .await
            .unwrap();

        let stored = store.get_resource("Manual.Key").await.unwrap().unwrap();
        assert_eq!(stored.value_for("", false), Some("New"));
        assert_eq!(stored.value_for("en", false), Some("Edited"));
        assert!(cache.get_resource("Manual.Key").is_none());
    }
}
