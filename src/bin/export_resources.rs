//! Export binary - dumps every stored resource as CSV
//!
//! Usage:
//!   cargo run --bin export                 # Write to the dated default file name
//!   cargo run --bin export -- out.csv      # Write to out.csv
//!   cargo run --bin export -- -            # Write to stdout
//!
//! Required environment variables:
//! - DATABASE_URL
//!
//! Optional:
//! - SUPPORTED_CULTURES (defaults to en)

use anyhow::{Context, Result};
use localization_store::config::Config;
use localization_store::db::Database;
use localization_store::formats::csv;
use localization_store::store::ResourceStore;
use std::io::Write;
use tracing::info;

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

    let db = Database::connect_with_retry(&config.database_url).await?;
    let resources = db.get_all_resources().await?;
    info!("Loaded {} resources", resources.len());

    let export = csv::export(&resources, &cultures.list(false))?;

    match std::env::args().nth(1).as_deref() {
        Some("-") => {
            std::io::stdout()
                .write_all(export.content.as_bytes())
                .context("Failed to write to stdout")?;
        }
        target => {
            let path = target.unwrap_or(&export.file_name).to_string();
            std::fs::write(&path, &export.content)
                .with_context(|| format!("Failed to write {}", path))?;
            info!("✓ Exported {} resources to {}", resources.len(), path);
        }
    }

    Ok(())
}
