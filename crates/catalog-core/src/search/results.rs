//! Result processing: run a compiled query, post-filter, and summarize.

use std::collections::HashSet;

use crate::models::{CatalogQuery, CatalogQueryResult, SearchHit};

use super::index::{FuzzyIndex, SearchItem};
use super::query::compile_query;
use super::stopwords::is_stop_word;

/// Shortest suggested keyword, in characters.
const MIN_KEYWORD_CHARS: usize = 3;

/// Execute `query` against `index`.
///
/// `matched_records` counts matches before the exclude-mapped /
/// exclude-linked post-filters; `item_keys` and `matched_catalogs` are
/// computed after them.
pub fn run_query(index: &FuzzyIndex, query: &CatalogQuery) -> CatalogQueryResult {
    let expr = compile_query(query);
    tracing::debug!(query = %expr.to_json(), "compiled catalog query");

    let matches = index.search(&expr);
    let matched_records = matches.len();

    let survivors: Vec<&SearchItem> = matches
        .iter()
        .map(|m| &index.items()[m.index])
        .filter(|item| !(query.exclude_mapped && item.classification_mapped_timestamp.is_some()))
        .filter(|item| !(query.exclude_linked && item.item_linked_timestamp.is_some()))
        .collect();

    let item_keys: Vec<SearchHit> = survivors
        .iter()
        .map(|item| SearchHit {
            item_id: item.item_id.clone(),
            office_id: item.office_id.clone(),
            record_id: item.record_id.clone(),
        })
        .collect();
    let matched_catalogs = item_keys
        .iter()
        .map(|k| k.office_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    CatalogQueryResult {
        key_words: suggest_keywords(&survivors, query),
        item_keys,
        matched_catalogs,
        matched_records,
    }
}

/// Keyword suggestions from result search strings and the query's
/// classification names, in first-seen order.
pub fn suggest_keywords(items: &[&SearchItem], query: &CatalogQuery) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    let sources = items
        .iter()
        .map(|item| item.search_string.as_str())
        .chain(query.classification_names.iter().map(String::as_str))
        .chain(query.sub_classification_names.iter().map(String::as_str));

    for text in sources {
        for token in text.split(' ') {
            let token = token.to_lowercase();
            if token.chars().count() < MIN_KEYWORD_CHARS || is_stop_word(&token) {
                continue;
            }
            if seen.insert(token.clone()) {
                keywords.push(token);
            }
        }
    }
    keywords
}
