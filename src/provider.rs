//! Lookup and administration of stored resources, with the cache in front.

use crate::cache::ResourceCache;
use crate::formats::csv::ParseResult;
use crate::i18n::CultureRegistry;
use crate::resource::{LocalizationResource, AUTHOR_IMPORT};
use crate::store::ResourceStore;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of applying an imported file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    /// Translations written to resources that already existed
    pub updated_translations: usize,
    pub unchanged: usize,
}

pub struct LocalizationProvider {
    store: Arc<dyn ResourceStore>,
    cache: Arc<ResourceCache>,
    cultures: Arc<CultureRegistry>,
}

impl LocalizationProvider {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        cache: Arc<ResourceCache>,
        cultures: Arc<CultureRegistry>,
    ) -> Self {
        Self {
            store,
            cache,
            cultures,
        }
    }

    pub fn cultures(&self) -> &CultureRegistry {
        &self.cultures
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Look up a resource, consulting the cache first.
    ///
    /// When the cache tracks known keys, an unknown key is answered without a
    /// store read.
    pub async fn get_resource(&self, key: &str) -> Result<Option<LocalizationResource>> {
        if let Some(resource) = self.cache.get_resource(key) {
            return Ok(Some(resource));
        }

        if self.cache.rules_out(key) {
            self.cache.metrics().record_known_key_rejection();
            return Ok(None);
        }

        let resource = self.store.get_resource(key).await?;
        if let Some(resource) = &resource {
            self.cache.insert_resource(resource.clone());
        }
        Ok(resource)
    }

    pub async fn get_translation(
        &self,
        key: &str,
        culture: &str,
        fallback_to_invariant: bool,
    ) -> Result<Option<String>> {
        Ok(self
            .get_resource(key)
            .await?
            .and_then(|r| r.value_for(culture, fallback_to_invariant).map(str::to_string)))
    }

    /// Every stored resource, ordered by key.
    pub async fn get_all_resources(&self) -> Result<Vec<LocalizationResource>> {
        let mut resources = self.store.get_all_resources().await?;
        resources.sort_by(|a, b| a.resource_key.cmp(&b.resource_key));
        Ok(resources)
    }

    pub async fn available_languages(&self, include_invariant: bool) -> Result<Vec<String>> {
        if let Some(languages) = self.cache.get_languages(include_invariant) {
            return Ok(languages);
        }

        let languages = self.store.available_languages(include_invariant).await?;
        self.cache.insert_languages(include_invariant, languages.clone());
        Ok(languages)
    }

    /// Human edit of one translation. Returns `false` when the resource does
    /// not exist.
    pub async fn create_or_update_translation(
        &self,
        key: &str,
        culture: &str,
        value: &str,
    ) -> Result<bool> {
        let culture = self.cultures.get(culture)?;
        let updated = self
            .store
            .create_or_update_translation(key, culture.code(), value)
            .await?;

        if updated {
            self.cache.invalidate_resource(key);
            info!("Translation {} [{}] updated", key, culture);
        }
        Ok(updated)
    }

    pub async fn remove_translation(&self, key: &str, culture: &str) -> Result<bool> {
        let culture = self.cultures.get(culture)?;
        let removed = self.store.remove_translation(key, culture.code()).await?;

        if removed {
            self.cache.invalidate_resource(key);
            info!("Translation {} [{}] removed", key, culture);
        }
        Ok(removed)
    }

    pub async fn delete_resource(&self, key: &str) -> Result<bool> {
        let deleted = self.store.delete_resource(key).await?;
        if deleted {
            self.cache.invalidate_resource(key);
            self.cache.forget_known_key(key);
            info!("Resource {} deleted", key);
        }
        Ok(deleted)
    }

    pub async fn delete_all_resources(&self) -> Result<u64> {
        let deleted = self.store.delete_all_resources().await?;
        self.cache.clear();
        info!("Deleted all {} resources", deleted);
        Ok(deleted)
    }

    /// Apply parsed import data. Existing resources go through the same edit
    /// path as the admin UI; unknown keys become new resources.
    pub async fn import(&self, parsed: &ParseResult) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for incoming in &parsed.resources {
            match self.store.get_resource(&incoming.resource_key).await? {
                Some(existing) => {
                    let mut changed = 0;
                    for translation in &incoming.translations {
                        if existing.value_for(&translation.culture, false)
                            == Some(translation.value.as_str())
                        {
                            continue;
                        }
                        self.create_or_update_translation(
                            &incoming.resource_key,
                            &translation.culture,
                            &translation.value,
                        )
                        .await?;
                        changed += 1;
                    }
                    if changed == 0 {
                        report.unchanged += 1;
                    }
                    report.updated_translations += changed;
                }
                None => {
                    let mut created = incoming.clone();
                    created.author = AUTHOR_IMPORT.to_string();
                    if self.store.insert_resource(&created).await? {
                        self.cache.invalidate_resource(&created.resource_key);
                        if self.cache.tracks_known_keys() {
                            self.cache.store_known_key(&created.resource_key);
                        }
                        report.inserted += 1;
                    }
                }
            }
        }

        debug!("Import applied: {:?}", report);
        info!(
            "✓ Imported {} resources ({} new, {} translations updated)",
            parsed.resources.len(),
            report.inserted,
            report.updated_translations
        );
        Ok(report)
    }
}
