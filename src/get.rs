//! Record retrieval by key.
//!
//! Fetches a single stored item record by office id and record id and
//! prints it as JSON. Used by `catalog get`.

use anyhow::{bail, Result};

use catalog_core::models::ItemRecord;

use crate::config::Config;
use crate::sqlite_store::SqliteCatalogStore;

/// Core get function returning the stored record.
pub async fn get_record(config: &Config, office_id: &str, record_id: &str) -> Result<ItemRecord> {
    let store = SqliteCatalogStore::open(config).await?;
    let record = store.get_record(office_id, record_id).await;
    store.close().await;

    match record? {
        Some(record) => Ok(record),
        None => bail!("record not found: {}/{}", office_id, record_id),
    }
}

/// CLI entry point: print the record as pretty JSON.
pub async fn run_get(config: &Config, office_id: &str, record_id: &str) -> Result<()> {
    let record = get_record(config, office_id, record_id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
