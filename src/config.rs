use crate::cache::CachePopulation;
use crate::i18n::{CultureError, CultureRegistry};
use crate::sync::plan::DEFAULT_BATCH_SIZE;
use crate::sync::SyncConfig;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Admin server
    pub port: u16,
    pub api_key: Option<String>,

    // Cultures
    pub supported_cultures: Vec<String>,
    pub default_culture: Option<String>,

    // Sync
    pub discover_and_register_resources: bool,
    pub populate_cache_on_startup: bool,
    pub sync_batch_size: usize,
    pub resource_manifest: String,
    pub sync_schedule: Option<String>,

    // Admin UI flags
    pub show_invariant_culture: bool,
    pub hide_delete_button: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            api_key: non_empty_var("API_KEY"),

            supported_cultures: std::env::var("SUPPORTED_CULTURES")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|_| vec!["en".to_string()]),
            default_culture: non_empty_var("DEFAULT_CULTURE"),

            discover_and_register_resources: bool_var("DISCOVER_AND_REGISTER_RESOURCES", true),
            populate_cache_on_startup: bool_var("POPULATE_CACHE_ON_STARTUP", true),
            sync_batch_size: std::env::var("SYNC_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            resource_manifest: std::env::var("RESOURCE_MANIFEST")
                .unwrap_or_else(|_| "resources.json".to_string()),
            sync_schedule: non_empty_var("SYNC_SCHEDULE"),

            show_invariant_culture: bool_var("SHOW_INVARIANT_CULTURE", false),
            hide_delete_button: bool_var("HIDE_DELETE_BUTTON", false),
        })
    }

    pub fn culture_registry(&self) -> Result<CultureRegistry, CultureError> {
        CultureRegistry::new(&self.supported_cultures, self.default_culture.as_deref())
    }

    /// Synchronizer settings; the default culture comes from the resolved registry.
    pub fn sync_config(&self, cultures: &CultureRegistry) -> SyncConfig {
        SyncConfig {
            discover_and_register: self.discover_and_register_resources,
            batch_size: self.sync_batch_size,
            cache_population: CachePopulation::from_flag(self.populate_cache_on_startup),
            default_culture: cultures.default_culture().to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bool_var(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
