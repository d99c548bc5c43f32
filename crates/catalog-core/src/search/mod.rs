//! Fuzzy, faceted search over catalog contents.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`index`] | Search projection and fuzzy token index |
//! | [`query`] | `CatalogQuery` → boolean expression compiler |
//! | [`results`] | Query execution, post-filters, keyword suggestions |
//! | [`session`] | Per-context session state (`load` / `search`) |
//! | [`stopwords`] | Stop words dropped from suggestions |

pub mod index;
pub mod query;
pub mod results;
pub mod session;
pub mod stopwords;

pub use index::{FuzzyIndex, IndexOptions, SearchItem};
pub use query::{compile_query, Expression, Field, Pattern};
pub use session::SearchSession;
