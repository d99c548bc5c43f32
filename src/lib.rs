//! # Catalog Engine
//!
//! Per-office inventory catalog import, master-catalog reconciliation, and
//! fuzzy faceted search.
//!
//! Office inventory exports (CSV) are normalized into item records, merged
//! with pricing data, and either promoted into the master catalog or linked
//! against it. Every stored catalog can then be searched through an
//! isolated searcher worker.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ CSV exports │──▶│ Import       │──▶│  SQLite   │
//! │ inv+pricing │   │ norm/merge/  │   │ records  │
//! └─────────────┘   │ link         │   └────┬─────┘
//!                   └──────────────┘        │
//!                                           ▼
//!                 ┌──────────┐       ┌─────────────┐
//!                 │   CLI    │◀─────▶│  Searcher   │
//!                 │(catalog) │ msgs  │ fuzzy index │
//!                 └──────────┘       └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! catalog init
//! catalog import --inventory master.csv --pricing master-prices.csv --master
//! catalog import --inventory north.csv --pricing north-prices.csv
//! catalog search --text "gauze" --office NORTH
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite catalog store |
//! | [`rows`] | CSV import file reader |
//! | [`ingest`] | `catalog import` |
//! | [`searcher`] | Isolated search worker |
//! | [`debounce`] | Debounced query submission |
//! | [`search`] | `catalog search` |
//! | [`get`] | `catalog get` |
//! | [`stats`] | `catalog stats` |
//!
//! Domain logic (normalization, pricing, linking, indexing) lives in the
//! `catalog-core` crate.

pub mod config;
pub mod db;
pub mod debounce;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod rows;
pub mod search;
pub mod searcher;
pub mod sqlite_store;
pub mod stats;
