//! # Catalog Core
//!
//! Runtime-free logic for the catalog engine: item models, row
//! normalization, pricing merge, master-catalog linking, the import
//! orchestrator, the store abstraction, and the fuzzy search session.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Persistence goes
//! through [`store::CatalogStore`]; the application crate supplies the
//! SQLite implementation and runs the search session in its own task.

pub mod error;
pub mod import;
pub mod linker;
pub mod models;
pub mod normalize;
pub mod pricing;
pub mod search;
pub mod store;

pub use error::{CatalogError, Result};
