//! Storage abstraction for office catalogs.
//!
//! The [`CatalogStore`] trait is the only persistence surface the import
//! orchestrator and search loader need, enabling pluggable backends
//! (SQLite in the application crate, in-memory here for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Catalog, Catalogs, LinkedItemUpdate};

/// Abstract catalog persistence backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch_catalog`](CatalogStore::fetch_catalog) | Load one office's catalog (empty if none) |
/// | [`fetch_all_catalogs`](CatalogStore::fetch_all_catalogs) | Load every office catalog, for the search index |
/// | [`create_catalog`](CatalogStore::create_catalog) | Upsert every record of a catalog under an office |
/// | [`apply_link_updates`](CatalogStore::apply_link_updates) | Rewrite `linkedItems` on master records |
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn fetch_catalog(&self, office_id: &str) -> Result<Catalog>;

    async fn fetch_all_catalogs(&self) -> Result<Catalogs>;

    /// Upsert the records of `catalog` under `office_id`.
    ///
    /// Records already stored under the same record id are replaced;
    /// other records of the office are kept.
    async fn create_catalog(&self, office_id: &str, catalog: &Catalog) -> Result<()>;

    /// Apply a batch of link updates, one write per master record.
    ///
    /// Updates naming a record that does not exist are skipped.
    async fn apply_link_updates(&self, updates: &[LinkedItemUpdate]) -> Result<()>;
}
