//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/catalog.sqlite"
//! busy_timeout_ms = 5000
//!
//! [catalog]
//! master_office_id = "MASTER"
//!
//! [search]
//! threshold = 0.5
//! min_match_char_length = 2
//! result_limit = 100
//! debounce_ms = 500
//!
//! [[offices]]
//! id = "NORTH"
//! name = "North Clinic"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use catalog_core::normalize::StaticOfficeRegistry;
use catalog_core::search::IndexOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub offices: Vec<OfficeConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl DbConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Office id that owns the master catalog.
    #[serde(default = "default_master_office_id")]
    pub master_office_id: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            master_office_id: default_master_office_id(),
        }
    }
}

fn default_master_office_id() -> String {
    "MASTER".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_min_match_char_length")]
    pub min_match_char_length: usize,
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Quiescence window for interactive query edits.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_match_char_length: default_min_match_char_length(),
            result_limit: default_result_limit(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}
fn default_min_match_char_length() -> usize {
    2
}
fn default_result_limit() -> usize {
    100
}
fn default_debounce_ms() -> u64 {
    500
}

impl SearchConfig {
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            threshold: self.threshold,
            min_match_char_length: self.min_match_char_length,
            limit: self.result_limit,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OfficeConfig {
    pub id: String,
    pub name: String,
}

impl Config {
    /// Office registry built from the `[[offices]]` table.
    pub fn office_registry(&self) -> StaticOfficeRegistry {
        StaticOfficeRegistry::new(self.offices.iter().map(|o| (o.id.clone(), o.name.clone())))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.catalog.master_office_id.trim().is_empty() {
        anyhow::bail!("catalog.master_office_id must not be empty");
    }

    if !(0.0..=1.0).contains(&config.search.threshold) {
        anyhow::bail!("search.threshold must be in [0.0, 1.0]");
    }

    if config.search.min_match_char_length == 0 {
        anyhow::bail!("search.min_match_char_length must be >= 1");
    }

    if config.search.result_limit == 0 {
        anyhow::bail!("search.result_limit must be >= 1");
    }

    for office in &config.offices {
        if office.id == config.catalog.master_office_id {
            anyhow::bail!(
                "office '{}' reuses the master office id; imports would overwrite the master catalog",
                office.id
            );
        }
    }

    Ok(config)
}
