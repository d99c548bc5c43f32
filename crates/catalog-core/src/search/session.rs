//! Search session: the state owned by one isolated search context.
//!
//! A session holds the fuzzy index derived from the last-loaded
//! [`Catalogs`] snapshot. Each `load` rebuilds the index from scratch.
//! Nothing is shared with the caller; the session is meant to be owned by
//! a single worker and driven through `load` / `search` messages.

use crate::error::{CatalogError, Result};
use crate::models::{CatalogQuery, CatalogQueryResult, Catalogs};

use super::index::{flatten_catalogs, FuzzyIndex, IndexOptions};
use super::results::run_query;

pub struct SearchSession {
    options: IndexOptions,
    index: Option<FuzzyIndex>,
}

impl SearchSession {
    pub fn new(options: IndexOptions) -> Self {
        Self {
            options,
            index: None,
        }
    }

    /// Replace the snapshot and rebuild the index.
    pub fn load(&mut self, catalogs: Catalogs) {
        let index = FuzzyIndex::build(flatten_catalogs(&catalogs), self.options.clone());
        tracing::info!(
            offices = catalogs.len(),
            items = index.len(),
            "search index loaded"
        );
        self.index = Some(index);
    }

    /// Run a query against the loaded index.
    ///
    /// Fails with [`CatalogError::SearcherNotLoaded`] before the first
    /// `load`. An absent query yields an empty result without touching the
    /// index.
    pub fn search(&self, query: Option<&CatalogQuery>) -> Result<CatalogQueryResult> {
        let index = self.index.as_ref().ok_or(CatalogError::SearcherNotLoaded)?;
        let Some(query) = query else {
            return Ok(CatalogQueryResult::default());
        };
        Ok(run_query(index, query))
    }
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(IndexOptions::default())
    }
}
