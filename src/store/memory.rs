use super::ResourceStore;
use crate::resource::{LocalizationResource, INVARIANT_CULTURE};
use crate::sync::plan::{SyncBatch, SyncOperation};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;

/// In-process store with the same semantics as the PostgreSQL store.
///
/// Used for embedding without a database and as the test double for sync.
#[derive(Default)]
pub struct MemoryResourceStore {
    resources: RwLock<BTreeMap<String, LocalizationResource>>,
    next_id: AtomicI64,
    /// Batch index -> number of upcoming attempts that should fail
    injected_failures: Mutex<HashMap<usize, u32>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `resources` (ids assigned when missing).
    pub fn with_resources(resources: Vec<LocalizationResource>) -> Self {
        let mut store = Self::new();
        let mut map = BTreeMap::new();
        for mut resource in resources {
            if resource.id.is_none() {
                resource.id = Some(store.allocate_id());
            }
            map.insert(resource.resource_key.clone(), resource);
        }
        *store.resources.get_mut() = map;
        store
    }

    /// Make the next `times` attempts to apply batch `index` fail.
    pub fn fail_batch(&self, index: usize, times: u32) {
        if let Ok(mut failures) = self.injected_failures.lock() {
            failures.insert(index, times);
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn take_injected_failure(&self, index: usize) -> bool {
        let Ok(mut failures) = self.injected_failures.lock() else {
            return false;
        };
        match failures.get_mut(&index) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn apply_operation(
        &self,
        resources: &mut BTreeMap<String, LocalizationResource>,
        operation: &SyncOperation,
    ) {
        match operation {
            SyncOperation::Rename { old_key, new_key } => {
                if resources.contains_key(new_key) {
                    return;
                }
                if let Some(mut renamed) = resources.remove(old_key) {
                    renamed.resource_key = new_key.clone();
                    renamed.from_code = true;
                    resources.insert(new_key.clone(), renamed);
                }
            }
            SyncOperation::Insert { resource } => match resources.get_mut(&resource.resource_key) {
                Some(existing) => {
                    existing.from_code = true;
                    existing.is_hidden = resource.is_hidden;
                    for t in &resource.translations {
                        existing.set_translation(&t.culture, &t.value);
                    }
                }
                None => {
                    let mut created = resource.clone();
                    created.id = Some(self.allocate_id());
                    resources.insert(created.resource_key.clone(), created);
                }
            },
            SyncOperation::Update {
                key,
                is_hidden,
                translations,
            } => {
                if let Some(existing) = resources.get_mut(key) {
                    existing.from_code = true;
                    existing.is_hidden = *is_hidden;
                    for t in translations {
                        existing.set_translation(&t.culture, &t.value);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn reset_sync_status(&self) -> Result<u64> {
        let mut resources = self.resources.write().await;
        for resource in resources.values_mut() {
            resource.from_code = false;
        }
        Ok(resources.len() as u64)
    }

    async fn get_all_resources(&self) -> Result<Vec<LocalizationResource>> {
        Ok(self.resources.read().await.values().cloned().collect())
    }

    async fn get_resource(&self, key: &str) -> Result<Option<LocalizationResource>> {
        Ok(self.resources.read().await.get(key).cloned())
    }

    async fn apply_batch(&self, batch: &SyncBatch) -> Result<()> {
        if self.take_injected_failure(batch.index) {
            bail!("Injected failure for batch {}", batch.index);
        }

        let mut resources = self.resources.write().await;
        // Work on a copy so a batch lands all-or-nothing.
        let mut staged = resources.clone();
        for operation in &batch.operations {
            self.apply_operation(&mut staged, operation);
        }
        *resources = staged;
        Ok(())
    }

    async fn create_or_update_translation(
        &self,
        key: &str,
        culture: &str,
        value: &str,
    ) -> Result<bool> {
        let mut resources = self.resources.write().await;
        let Some(resource) = resources.get_mut(key) else {
            return Ok(false);
        };

        resource.set_translation(culture, value);
        resource.is_modified = Some(true);
        resource.modification_date = Utc::now();
        Ok(true)
    }

    async fn remove_translation(&self, key: &str, culture: &str) -> Result<bool> {
        let mut resources = self.resources.write().await;
        let Some(resource) = resources.get_mut(key) else {
            return Ok(false);
        };

        if !resource.remove_translation(culture) {
            return Ok(false);
        }
        resource.is_modified = Some(true);
        resource.modification_date = Utc::now();
        Ok(true)
    }

    async fn insert_resource(&self, resource: &LocalizationResource) -> Result<bool> {
        let mut resources = self.resources.write().await;
        if resources.contains_key(&resource.resource_key) {
            return Ok(false);
        }

        let mut created = resource.clone();
        created.id = Some(self.allocate_id());
        resources.insert(created.resource_key.clone(), created);
        Ok(true)
    }

    async fn delete_resource(&self, key: &str) -> Result<bool> {
        Ok(self.resources.write().await.remove(key).is_some())
    }

    async fn delete_all_resources(&self) -> Result<u64> {
        let mut resources = self.resources.write().await;
        let removed = resources.len() as u64;
        resources.clear();
        Ok(removed)
    }

    async fn available_languages(&self, include_invariant: bool) -> Result<Vec<String>> {
        let resources = self.resources.read().await;
        let languages: BTreeSet<String> = resources
            .values()
            .flat_map(|r| r.translations.iter().map(|t| t.culture.clone()))
            .filter(|culture| include_invariant || culture != INVARIANT_CULTURE)
            .collect();
        Ok(languages.into_iter().collect())
    }
}
