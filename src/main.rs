use anyhow::{Context, Result};
use localization_store::admin::{self, AdminState};
use localization_store::cache::ResourceCache;
use localization_store::config::Config;
use localization_store::db::Database;
use localization_store::provider::LocalizationProvider;
use localization_store::scheduler;
use localization_store::store::ResourceStore;
use localization_store::sync::discovery::{Discoverer, ManifestDiscoverer};
use localization_store::sync::ResourceSynchronizer;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("localization_store=info".parse()?),
        )
        .init();

    info!("Starting localization server");

    let config = Config::from_env()?;
    let cultures = Arc::new(config.culture_registry().context("Invalid culture configuration")?);
    info!(
        "✓ Cultures: {:?} (default: {})",
        cultures.list(false),
        cultures.default_culture()
    );

    let db = Database::connect_with_retry(&config.database_url).await?;
    info!("✓ Database ready");

    let store: Arc<dyn ResourceStore> = Arc::new(db);
    let cache = Arc::new(ResourceCache::new());

    let synchronizer = Arc::new(ResourceSynchronizer::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        config.sync_config(&cultures),
    ));
    let resources: Arc<dyn Discoverer> =
        Arc::new(ManifestDiscoverer::resources(&config.resource_manifest));
    let models: Arc<dyn Discoverer> = Arc::new(ManifestDiscoverer::models(&config.resource_manifest));

    // A failed sync leaves the previous state in place; keep serving it.
    match synchronizer
        .discover_and_register(Arc::clone(&resources), Arc::clone(&models))
        .await
    {
        Ok(report) if !report.is_complete() => warn!(
            "Startup sync incomplete, failed batches: {:?}",
            report.failed_batches
        ),
        Ok(_) => {}
        Err(e) => error!("Startup sync failed: {:#}", e),
    }

    let _scheduler = match &config.sync_schedule {
        Some(schedule) => Some(
            scheduler::start_scheduler(schedule, Arc::clone(&synchronizer), resources, models)
                .await?,
        ),
        None => None,
    };

    let provider = Arc::new(LocalizationProvider::new(store, cache, cultures));
    let app = admin::router(AdminState::from_config(provider, &config));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("✓ Admin API listening on {}", addr);
    if config.api_key.is_none() {
        warn!("API_KEY not set: mutating admin routes are open");
    }

    axum::serve(listener, app).await?;
    Ok(())
}
