//! Fuzzy token index over the flattened catalog projection.
//!
//! # Projection
//!
//! Every record of every office becomes one [`SearchItem`] whose
//! `searchString` is the space-joined classification name,
//! sub-classification name, item description, and definition.
//!
//! # Matching
//!
//! `searchString` is tokenized on non-alphanumeric boundaries into a
//! lower-cased vocabulary with postings lists. A fuzzy term is compared
//! once per vocabulary token rather than once per item:
//!
//! 0. A term that is a literal substring of the whole field (punctuation
//!    included) matches with score 0.
//! 1. A token containing the term scores a perfect similarity of `1.0`.
//! 2. Otherwise similarity is `strsim::normalized_levenshtein`.
//! 3. Tokens with similarity `>= 1 - threshold` match; the item score is
//!    `1 - best similarity` (0 is perfect).
//!
//! Terms shorter than `min_match_char_length` characters never match.
//! Id fields have exact-value postings for `="id"` lookups.
//!
//! `And` keeps items matched by every child (mean score); `Or` keeps items
//! matched by any child (best score).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Catalogs;

use super::query::{Expression, Field, Pattern};

/// Tuning for index construction and retrieval.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Maximum fuzzy distance, in `[0, 1]`. 0 requires an exact token.
    pub threshold: f64,
    /// Shortest term, in characters, that can match.
    pub min_match_char_length: usize,
    /// Maximum number of ranked matches returned by one search.
    pub limit: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_match_char_length: 2,
            limit: 100,
        }
    }
}

/// One flattened, searchable record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub search_string: String,
    pub classification_id: String,
    pub sub_classification_id: String,
    pub office_id: String,
    pub item_id: String,
    pub record_id: String,
    pub classification_mapped_timestamp: Option<DateTime<Utc>>,
    pub item_linked_timestamp: Option<DateTime<Utc>>,
}

impl SearchItem {
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::SearchString => &self.search_string,
            Field::ClassificationId => &self.classification_id,
            Field::SubClassificationId => &self.sub_classification_id,
            Field::OfficeId => &self.office_id,
        }
    }
}

/// Flatten every record of every office into the search projection.
pub fn flatten_catalogs(catalogs: &Catalogs) -> Vec<SearchItem> {
    catalogs
        .values()
        .flat_map(|catalog| catalog.values())
        .map(|item| SearchItem {
            search_string: format!(
                "{} {} {} {}",
                item.classification_name,
                item.sub_classification_name,
                item.item_description,
                item.definition
            ),
            classification_id: item.classification_id.clone(),
            sub_classification_id: item.sub_classification_id.clone(),
            office_id: item.office_id.clone(),
            item_id: item.item_id.clone(),
            record_id: item.record_id.clone(),
            classification_mapped_timestamp: item.classification_mapped_timestamp,
            item_linked_timestamp: item.item_linked_timestamp,
        })
        .collect()
}

/// A ranked match: position in [`FuzzyIndex::items`] plus score (0 = perfect).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMatch {
    pub index: usize,
    pub score: f64,
}

type Matches = HashMap<usize, f64>;

/// Split text into lower-cased alphanumeric tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

pub struct FuzzyIndex {
    items: Vec<SearchItem>,
    lowered: Vec<String>,
    vocabulary: HashMap<String, Vec<usize>>,
    exact: HashMap<(Field, String), Vec<usize>>,
    options: IndexOptions,
}

impl FuzzyIndex {
    pub fn build(items: Vec<SearchItem>, options: IndexOptions) -> Self {
        let mut vocabulary: HashMap<String, Vec<usize>> = HashMap::new();
        let mut exact: HashMap<(Field, String), Vec<usize>> = HashMap::new();
        let mut lowered = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            lowered.push(item.search_string.to_lowercase());
            for token in tokenize(&item.search_string) {
                let postings = vocabulary.entry(token).or_default();
                if postings.last() != Some(&i) {
                    postings.push(i);
                }
            }
            for field in [
                Field::ClassificationId,
                Field::SubClassificationId,
                Field::OfficeId,
            ] {
                exact
                    .entry((field, item.field(field).to_string()))
                    .or_default()
                    .push(i);
            }
        }

        tracing::debug!(
            items = items.len(),
            vocabulary = vocabulary.len(),
            "built fuzzy index"
        );

        Self {
            items,
            lowered,
            vocabulary,
            exact,
            options,
        }
    }

    pub fn items(&self) -> &[SearchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Evaluate `expr`, returning at most `options.limit` matches sorted by
    /// score (ties keep index order).
    pub fn search(&self, expr: &Expression) -> Vec<ScoredMatch> {
        let mut ranked: Vec<ScoredMatch> = self
            .evaluate(expr)
            .into_iter()
            .map(|(index, score)| ScoredMatch { index, score })
            .collect();
        ranked.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        ranked.truncate(self.options.limit);
        ranked
    }

    fn all(&self) -> Matches {
        (0..self.items.len()).map(|i| (i, 0.0)).collect()
    }

    fn evaluate(&self, expr: &Expression) -> Matches {
        match expr {
            Expression::And(children) => {
                let mut iter = children.iter();
                let Some(first) = iter.next() else {
                    return self.all();
                };
                let mut acc = self.evaluate(first);
                for child in iter {
                    if acc.is_empty() {
                        break;
                    }
                    let next = self.evaluate(child);
                    acc.retain(|i, score| match next.get(i) {
                        Some(s) => {
                            *score += s;
                            true
                        }
                        None => false,
                    });
                }
                let n = children.len() as f64;
                acc.values_mut().for_each(|s| *s /= n);
                acc
            }
            Expression::Or(children) => {
                let mut acc = Matches::new();
                for child in children {
                    for (i, s) in self.evaluate(child) {
                        acc.entry(i)
                            .and_modify(|best| *best = best.min(s))
                            .or_insert(s);
                    }
                }
                acc
            }
            Expression::Term { field, pattern } => self.evaluate_term(*field, pattern),
        }
    }

    fn evaluate_term(&self, field: Field, pattern: &Pattern) -> Matches {
        match pattern {
            Pattern::Exact(value) => self.exact_matches(field, value),
            Pattern::Include(value) => self.include_matches(field, value),
            Pattern::Fuzzy(text) => {
                let mut terms = text.split_whitespace();
                let Some(first) = terms.next() else {
                    return Matches::new();
                };
                let mut acc = self.fuzzy_term(field, first);
                let mut count = 1.0;
                for term in terms {
                    if acc.is_empty() {
                        break;
                    }
                    let next = self.fuzzy_term(field, term);
                    acc.retain(|i, score| match next.get(i) {
                        Some(s) => {
                            *score += s;
                            true
                        }
                        None => false,
                    });
                    count += 1.0;
                }
                acc.values_mut().for_each(|s| *s /= count);
                acc
            }
        }
    }

    fn exact_matches(&self, field: Field, value: &str) -> Matches {
        if field == Field::SearchString {
            return self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.search_string == value)
                .map(|(i, _)| (i, 0.0))
                .collect();
        }
        self.exact
            .get(&(field, value.to_string()))
            .map(|postings| postings.iter().map(|&i| (i, 0.0)).collect())
            .unwrap_or_default()
    }

    fn include_matches(&self, field: Field, value: &str) -> Matches {
        let needle = value.to_lowercase();
        if needle.chars().count() < self.options.min_match_char_length {
            return Matches::new();
        }
        self.items
            .iter()
            .enumerate()
            .filter(|(i, item)| match field {
                Field::SearchString => self.lowered[*i].contains(&needle),
                _ => item.field(field).to_lowercase().contains(&needle),
            })
            .map(|(i, _)| (i, 0.0))
            .collect()
    }

    fn fuzzy_term(&self, field: Field, term: &str) -> Matches {
        match Pattern::parse(term) {
            Pattern::Fuzzy(_) => {}
            other => return self.evaluate_term(field, &other),
        }

        let needle = term.to_lowercase();
        if needle.chars().count() < self.options.min_match_char_length {
            return Matches::new();
        }
        let min_similarity = 1.0 - self.options.threshold;

        if field != Field::SearchString {
            return self
                .items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let sim = similarity(&needle, &item.field(field).to_lowercase());
                    (sim >= min_similarity).then_some((i, 1.0 - sim))
                })
                .collect();
        }

        // Literal substrings of the whole field, punctuation included.
        let mut acc: Matches = self
            .lowered
            .iter()
            .enumerate()
            .filter(|(_, text)| text.contains(&needle))
            .map(|(i, _)| (i, 0.0))
            .collect();
        for (token, postings) in &self.vocabulary {
            let sim = similarity(&needle, token);
            if sim < min_similarity {
                continue;
            }
            let score = 1.0 - sim;
            for &i in postings {
                acc.entry(i)
                    .and_modify(|best| *best = best.min(score))
                    .or_insert(score);
            }
        }
        acc
    }
}

fn similarity(needle: &str, token: &str) -> f64 {
    if token.contains(needle) {
        1.0
    } else {
        strsim::normalized_levenshtein(needle, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Catalog, ItemRecord};

    fn item(office: &str, id: &str, class: &str, description: &str) -> ItemRecord {
        ItemRecord {
            record_id: format!("{}-{}", office, id),
            office_id: office.into(),
            item_id: id.into(),
            classification_id: class.into(),
            classification_name: "Medical".into(),
            sub_classification_name: "Supplies".into(),
            item_description: description.into(),
            definition: String::new(),
            ..Default::default()
        }
    }

    fn index_of(records: Vec<ItemRecord>) -> FuzzyIndex {
        let mut catalogs = Catalogs::new();
        for r in records {
            catalogs
                .entry(r.office_id.clone())
                .or_insert_with(Catalog::new)
                .insert(r.record_id.clone(), r);
        }
        FuzzyIndex::build(flatten_catalogs(&catalogs), IndexOptions::default())
    }

    fn fuzzy(text: &str) -> Expression {
        Expression::Term {
            field: Field::SearchString,
            pattern: Pattern::Fuzzy(text.into()),
        }
    }

    fn item_ids(index: &FuzzyIndex, matches: &[ScoredMatch]) -> Vec<String> {
        matches
            .iter()
            .map(|m| index.items()[m.index].item_id.clone())
            .collect()
    }

    #[test]
    fn test_fuzzy_term_matches_punctuated_substring() {
        let mut record = item("N", "1", "C1", "X-Ray film 1/2 sheet");
        record.classification_name = "Imaging".into();
        let index = index_of(vec![record, item("N", "2", "C1", "Gauze pads")]);

        let hits = index.search(&fuzzy("1/2"));
        assert_eq!(item_ids(&index, &hits), vec!["1"]);
        assert_eq!(hits[0].score, 0.0);

        assert_eq!(item_ids(&index, &index.search(&fuzzy("x-ray"))), vec!["1"]);
    }

    #[test]
    fn test_search_string_projection() {
        let index = index_of(vec![item("N", "1", "C1", "Gauze pads")]);
        assert_eq!(index.items()[0].search_string, "Medical Supplies Gauze pads ");
    }

    #[test]
    fn test_fuzzy_tolerates_typo() {
        let index = index_of(vec![
            item("N", "1", "C1", "Amoxicillin"),
            item("N", "2", "C1", "Bandage"),
        ]);
        let matches = index.search(&fuzzy("amoxicilin"));
        assert_eq!(item_ids(&index, &matches), vec!["1"]);
        assert!(matches[0].score > 0.0);
    }

    #[test]
    fn test_substring_is_perfect_score() {
        let index = index_of(vec![item("N", "1", "C1", "Amoxicillin")]);
        let matches = index.search(&fuzzy("amox"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 0.0);
    }

    #[test]
    fn test_short_terms_never_match() {
        let index = index_of(vec![item("N", "1", "C1", "X ray film")]);
        assert!(index.search(&fuzzy("x")).is_empty());
    }

    #[test]
    fn test_exact_and_or() {
        let index = index_of(vec![
            item("N", "1", "C1", "Gauze"),
            item("N", "2", "C2", "Gauze"),
            item("S", "3", "C1", "Tape"),
        ]);
        let expr = Expression::And(vec![
            Expression::Or(vec![Expression::Term {
                field: Field::ClassificationId,
                pattern: Pattern::Exact("C1".into()),
            }]),
            Expression::Or(vec![fuzzy("gauze")]),
        ]);
        assert_eq!(item_ids(&index, &index.search(&expr)), vec!["1"]);
    }

    #[test]
    fn test_empty_and_matches_all_capped() {
        let records = (0..5).map(|i| item("N", &i.to_string(), "C", "Gauze")).collect();
        let mut index = index_of(records);
        assert_eq!(index.search(&Expression::And(vec![])).len(), 5);
        index.options.limit = 2;
        assert_eq!(index.search(&Expression::And(vec![])).len(), 2);
    }

    #[test]
    fn test_prefixed_terms_inside_free_text() {
        let index = index_of(vec![
            item("N", "1", "C1", "Gauze sterile"),
            item("N", "2", "C1", "Gauze"),
        ]);
        let matches = index.search(&fuzzy("gauze 'sterile"));
        assert_eq!(item_ids(&index, &matches), vec!["1"]);
    }

    #[test]
    fn test_ranked_by_score() {
        let index = index_of(vec![
            item("N", "1", "C1", "Bandoge"),
            item("N", "2", "C1", "Bandage"),
        ]);
        let matches = index.search(&fuzzy("bandage"));
        assert_eq!(item_ids(&index, &matches), vec!["2", "1"]);
    }
}
