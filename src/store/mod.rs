//! Persistence boundary for localization resources.
//!
//! The store is the single authority for persisted state. Sync, the admin API
//! and imports only talk to it through [`ResourceStore`].

mod memory;

pub use memory::MemoryResourceStore;

use crate::resource::LocalizationResource;
use crate::sync::plan::SyncBatch;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> Result<()>;

    /// Clear the "from code" flag on every resource ahead of a sync pass.
    async fn reset_sync_status(&self) -> Result<u64>;

    async fn get_all_resources(&self) -> Result<Vec<LocalizationResource>>;

    async fn get_resource(&self, key: &str) -> Result<Option<LocalizationResource>>;

    /// Apply one batch atomically: either every operation lands or none does.
    async fn apply_batch(&self, batch: &SyncBatch) -> Result<()>;

    /// Human edit of a single translation. Marks the resource modified.
    /// Returns `false` when no resource has this key.
    async fn create_or_update_translation(&self, key: &str, culture: &str, value: &str)
        -> Result<bool>;

    /// Human removal of a single translation. Marks the resource modified.
    /// Returns `false` when nothing was removed.
    async fn remove_translation(&self, key: &str, culture: &str) -> Result<bool>;

    /// Insert a resource that does not exist yet. Returns `false` if the key is taken.
    async fn insert_resource(&self, resource: &LocalizationResource) -> Result<bool>;

    async fn delete_resource(&self, key: &str) -> Result<bool>;

    async fn delete_all_resources(&self) -> Result<u64>;

    /// Distinct cultures that have at least one translation, sorted.
    async fn available_languages(&self, include_invariant: bool) -> Result<Vec<String>>;
}
