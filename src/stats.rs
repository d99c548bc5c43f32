//! Catalog statistics.
//!
//! Summarizes what is stored: record counts per office, how many local
//! records are linked to the master catalog, and how many master records
//! carry back-links. Used by `catalog stats`.

use anyhow::Result;

use catalog_core::models::Catalog;
use catalog_core::store::CatalogStore;

use crate::config::Config;
use crate::sqlite_store::SqliteCatalogStore;

/// Per-office breakdown.
struct OfficeStats {
    office_id: String,
    records: usize,
    linked: usize,
    mapped: usize,
    last_write_ts: Option<i64>,
}

impl OfficeStats {
    fn from_catalog(office_id: &str, catalog: &Catalog, is_master: bool) -> Self {
        let linked = if is_master {
            catalog.values().filter(|r| !r.linked_items.is_empty()).count()
        } else {
            catalog.values().filter(|r| r.item_linked_to.is_some()).count()
        };
        Self {
            office_id: office_id.to_string(),
            records: catalog.len(),
            linked,
            mapped: catalog
                .values()
                .filter(|r| r.classification_mapped_timestamp.is_some())
                .count(),
            last_write_ts: None,
        }
    }
}

/// Run the stats command: read the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteCatalogStore::open(config).await?;
    let catalogs = store.fetch_all_catalogs().await?;
    let last_writes = store.last_write_times().await?;
    store.close().await;

    let master_id = &config.catalog.master_office_id;
    let mut offices: Vec<OfficeStats> = catalogs
        .iter()
        .map(|(office_id, catalog)| {
            let mut stats = OfficeStats::from_catalog(office_id, catalog, office_id == master_id);
            stats.last_write_ts = last_writes.get(office_id).copied();
            stats
        })
        .collect();
    // Master first, then offices by id
    offices.sort_by_key(|s| (s.office_id != *master_id, s.office_id.clone()));

    let total: usize = offices.iter().map(|s| s.records).sum();
    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Catalog Stats");
    println!("=============");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Catalogs:    {}", offices.len());
    println!("  Records:     {}", total);
    if !catalogs.contains_key(master_id) {
        println!("  Master:      (none; import one with --master)");
    }

    if !offices.is_empty() {
        println!();
        println!(
            "  {:<20} {:>8} {:>8} {:>8}   {}",
            "OFFICE", "RECORDS", "LINKED", "MAPPED", "LAST IMPORT"
        );
        println!("  {}", "-".repeat(66));

        for s in &offices {
            let label = if s.office_id == *master_id {
                format!("{} (master)", s.office_id)
            } else {
                s.office_id.clone()
            };
            let write_display = match s.last_write_ts {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<20} {:>8} {:>8} {:>8}   {}",
                label, s.records, s.linked, s.mapped, write_display
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
