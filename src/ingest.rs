//! `catalog import`: read import files, run the import pipeline, report.
//!
//! The run metadata is printed on stdout (human summary or JSON) and is
//! not persisted. Missing input files and unresolvable offices abort the
//! run before anything is written.

use std::path::PathBuf;

use anyhow::Result;

use catalog_core::import::{import_catalog, ImportRequest};
use catalog_core::linker::FirstMatch;
use catalog_core::models::OfficeCatalogMetadata;

use crate::config::Config;
use crate::rows::read_rows;
use crate::sqlite_store::SqliteCatalogStore;

pub async fn run_import(
    config: &Config,
    inventory: Option<PathBuf>,
    pricing: Option<PathBuf>,
    master: bool,
    json: bool,
) -> Result<()> {
    let inventory_rows = inventory.as_deref().map(read_rows).transpose()?;
    let pricing_rows = pricing.as_deref().map(read_rows).transpose()?;

    let request = ImportRequest {
        inventory: inventory_rows,
        pricing: pricing_rows,
        master_catalog: master,
        master_office_id: config.catalog.master_office_id.clone(),
    };

    let store = SqliteCatalogStore::open(config).await?;
    let registry = config.office_registry();

    let outcome = import_catalog(&store, &registry, &FirstMatch, &request).await;
    store.close().await;
    let meta = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
    } else {
        print_summary(&meta, master, &config.catalog.master_office_id);
    }
    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    println!("  {}: {}", label, items.len());
    if !items.is_empty() {
        println!("    {}", items.join(", "));
    }
}

fn print_summary(meta: &OfficeCatalogMetadata, master: bool, master_office_id: &str) {
    let office = meta.office_id.as_deref().unwrap_or("?");
    if master {
        println!("import {} -> master catalog {}", office, master_office_id);
    } else {
        println!("import {}", office);
    }
    println!("  inventory rows: {}", meta.inventory_items_imported);
    println!("  pricing rows: {}", meta.pricing_items_imported);
    println!("  matched pricing: {}", meta.matched_pricing_items);
    print_list("unmatched pricing", &meta.unmatched_pricing_items);
    print_list("errored pricing", &meta.errored_pricing_items);
    print_list("multiple pricing entries", &meta.multiple_pricing_info_items);
    print_list("non-numeric price fields", &meta.invalid_numeric_fields);
    if !master {
        println!("  linked to master: {}", meta.number_of_items_linked_to_master);
    }
    println!("ok");
}
