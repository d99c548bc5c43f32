//! Error types for catalog import and search.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Failures that abort an operation.
///
/// Row-level problems during pricing merge never surface here; they are
/// recorded in [`OfficeCatalogMetadata`](crate::models::OfficeCatalogMetadata).
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A required import input was not supplied.
    #[error("No {0} file provided")]
    MissingImportFile(&'static str),

    /// The location name on an inventory row matched no known office.
    #[error("No office found for location '{location}'")]
    OfficeNotFound { location: String },

    /// Inventory input had no rows to derive an office from.
    #[error("No catalog created: inventory file has no rows")]
    NoCatalog,

    /// `search` issued against a session that never received `load`.
    #[error("Searcher not initialized: search issued before load")]
    SearcherNotLoaded,

    /// The catalog store failed.
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}
