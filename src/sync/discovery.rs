//! Resource discovery.
//!
//! How resources are found is up to the host application: anything that can
//! list its declared resources implements [`Discoverer`]. Plain resources and
//! model-bound resources are scanned as two independent tasks and combined
//! before merging.

use crate::resource::{DiscoveredResource, DiscoveredTranslation};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Source of code-declared resources.
pub trait Discoverer: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// List declared resources. May block (file or type-table reads).
    fn discover(&self) -> Result<Vec<DiscoveredResource>>;
}

/// Fixed resource list, for hosts that declare resources in code.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    name: String,
    resources: Vec<DiscoveredResource>,
}

impl StaticDiscoverer {
    pub fn new(name: impl Into<String>, resources: Vec<DiscoveredResource>) -> Self {
        Self {
            name: name.into(),
            resources,
        }
    }
}

impl Discoverer for StaticDiscoverer {
    fn name(&self) -> &str {
        &self.name
    }

    fn discover(&self) -> Result<Vec<DiscoveredResource>> {
        Ok(self.resources.clone())
    }
}

/// Which half of the manifest a [`ManifestDiscoverer`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSection {
    Resources,
    Models,
}

/// Reads declarations from a JSON manifest generated by the host build:
///
/// ```json
/// {
///   "resources": [{ "key": "Home.Title", "translations": { "": "Welcome" } }],
///   "models": [{ "key": "User.Name", "oldKey": "User.FullName", "hidden": false,
///                "translations": { "": "Name", "en": "Name" } }]
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ManifestDiscoverer {
    path: PathBuf,
    section: ManifestSection,
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    resources: Vec<ManifestEntry>,
    #[serde(default)]
    models: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    key: String,
    #[serde(default)]
    old_key: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    translations: BTreeMap<String, String>,
}

impl From<ManifestEntry> for DiscoveredResource {
    fn from(entry: ManifestEntry) -> Self {
        DiscoveredResource {
            key: entry.key,
            old_key: entry.old_key,
            translations: entry
                .translations
                .into_iter()
                .map(|(culture, text)| DiscoveredTranslation::new(culture, text))
                .collect(),
            is_hidden: entry.hidden,
        }
    }
}

impl ManifestDiscoverer {
    pub fn resources(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            section: ManifestSection::Resources,
        }
    }

    pub fn models(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            section: ManifestSection::Models,
        }
    }
}

impl Discoverer for ManifestDiscoverer {
    fn name(&self) -> &str {
        match self.section {
            ManifestSection::Resources => "resources",
            ManifestSection::Models => "models",
        }
    }

    fn discover(&self) -> Result<Vec<DiscoveredResource>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read resource manifest {:?}", self.path))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse resource manifest {:?}", self.path))?;

        let entries = match self.section {
            ManifestSection::Resources => manifest.resources,
            ManifestSection::Models => manifest.models,
        };

        Ok(entries.into_iter().map(DiscoveredResource::from).collect())
    }
}

/// Combined output of both discovery scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub resources: Vec<DiscoveredResource>,
    /// Keys declared by both scans
    pub duplicate_keys: Vec<String>,
}

/// Run the plain-resource scan and the model scan concurrently and combine
/// their results.
pub async fn discover_all(
    resources: Arc<dyn Discoverer>,
    models: Arc<dyn Discoverer>,
) -> Result<Discovery> {
    let (plain, modelled) = tokio::try_join!(run_scan(resources), run_scan(models))?;
    Ok(combine_discoveries(plain, modelled))
}

async fn run_scan(discoverer: Arc<dyn Discoverer>) -> Result<Vec<DiscoveredResource>> {
    let name = discoverer.name().to_string();
    let found = tokio::task::spawn_blocking(move || discoverer.discover())
        .await
        .with_context(|| format!("Discovery scan '{}' panicked", name))?
        .with_context(|| format!("Discovery scan '{}' failed", name))?;

    info!("Discovery scan '{}' found {} resources", name, found.len());
    Ok(distinct_by_key(&name, found))
}

/// Drop repeated declarations inside one scan, keeping the first.
fn distinct_by_key(scan: &str, resources: Vec<DiscoveredResource>) -> Vec<DiscoveredResource> {
    let mut seen = HashSet::new();
    resources
        .into_iter()
        .filter(|r| {
            let first = seen.insert(r.key.clone());
            if !first {
                debug!("Scan '{}' declares {} more than once, keeping first", scan, r.key);
            }
            first
        })
        .collect()
}

/// Combine the two scans keyed by resource key. On a key declared by both, the
/// model scan wins and the key is reported.
pub fn combine_discoveries(
    plain: Vec<DiscoveredResource>,
    models: Vec<DiscoveredResource>,
) -> Discovery {
    let mut resources: Vec<DiscoveredResource> = Vec::with_capacity(plain.len() + models.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut duplicate_keys = Vec::new();

    for resource in plain.into_iter().chain(models) {
        match positions.get(&resource.key) {
            Some(&position) => {
                warn!(
                    "Resource key {} discovered by both scans, last declaration wins",
                    resource.key
                );
                duplicate_keys.push(resource.key.clone());
                resources[position] = resource;
            }
            None => {
                positions.insert(resource.key.clone(), resources.len());
                resources.push(resource);
            }
        }
    }

    Discovery {
        resources,
        duplicate_keys,
    }
}
