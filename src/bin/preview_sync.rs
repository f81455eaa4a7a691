//! Preview binary - plans a sync pass against the database without applying it
//!
//! Usage:
//!   cargo run --bin preview                       # Use RESOURCE_MANIFEST
//!   cargo run --bin preview -- path/to/manifest   # Use another manifest
//!
//! Prints the planned batches as JSON on stdout.
//!
//! Required environment variables:
//! - DATABASE_URL

use anyhow::Result;
use localization_store::cache::ResourceCache;
use localization_store::config::Config;
use localization_store::db::Database;
use localization_store::sync::discovery::{discover_all, ManifestDiscoverer};
use localization_store::sync::ResourceSynchronizer;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localization_store=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let cultures = config.culture_registry()?;
    let manifest = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.resource_manifest.clone());

    info!("Reading manifest {}", manifest);
    let discovery = discover_all(
        Arc::new(ManifestDiscoverer::resources(&manifest)),
        Arc::new(ManifestDiscoverer::models(&manifest)),
    )
    .await?;

    if !discovery.duplicate_keys.is_empty() {
        warn!("Duplicate keys: {:?}", discovery.duplicate_keys);
    }

    let db = Database::connect_with_retry(&config.database_url).await?;
    let synchronizer = ResourceSynchronizer::new(
        Arc::new(db),
        Arc::new(ResourceCache::new()),
        config.sync_config(&cultures),
    );
    let batches = synchronizer.preview(&discovery.resources).await?;

    let inserts: usize = batches.iter().map(|b| b.inserts()).sum();
    let updates: usize = batches.iter().map(|b| b.updates()).sum();
    let renames: usize = batches.iter().map(|b| b.renames()).sum();
    info!(
        "Planned {} batches: {} inserts, {} updates, {} renames",
        batches.len(),
        inserts,
        updates,
        renames
    );

    let output = json!({
        "discovered": discovery.resources.len(),
        "duplicateKeys": discovery.duplicate_keys,
        "batches": batches,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
