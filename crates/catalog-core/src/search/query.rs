//! Query compiler: [`CatalogQuery`] → boolean [`Expression`] tree.
//!
//! The compiled tree is a conjunction of disjunctions, one OR-group per
//! non-empty filter dimension, in this order:
//!
//! | Dimension | Field | Pattern |
//! |-----------|-------|---------|
//! | keywords | `searchString` | include (`'token`) |
//! | free text | `searchString` | fuzzy |
//! | classification ids | `classificationId` | exact (`="id"`) |
//! | sub-classification ids | `subClassificationId` | exact |
//! | office ids | `officeId` | exact |
//!
//! Empty dimensions contribute nothing, so a query with no filters is an
//! empty `And`, which matches every indexed item.

use serde_json::{json, Value};

use crate::models::CatalogQuery;

/// Indexed fields of the search projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SearchString,
    ClassificationId,
    SubClassificationId,
    OfficeId,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::SearchString => "searchString",
            Field::ClassificationId => "classificationId",
            Field::SubClassificationId => "subClassificationId",
            Field::OfficeId => "officeId",
        }
    }
}

/// How a term is matched against a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Field equals the value.
    Exact(String),
    /// Field contains the value, case-insensitive.
    Include(String),
    /// Whitespace-separated terms, all of which must match approximately.
    /// A term may itself carry a `'` (include) or `=` (exact) prefix.
    Fuzzy(String),
}

impl Pattern {
    /// Parse one extended-syntax pattern: `="v"` / `=v`, `'v`, or plain text.
    pub fn parse(raw: &str) -> Pattern {
        if let Some(rest) = raw.strip_prefix('=') {
            Pattern::Exact(strip_quotes(rest).to_string())
        } else if let Some(rest) = raw.strip_prefix('\'') {
            Pattern::Include(rest.to_string())
        } else {
            Pattern::Fuzzy(raw.to_string())
        }
    }

    fn to_syntax(&self) -> String {
        match self {
            Pattern::Exact(v) => format!("=\"{}\"", v),
            Pattern::Include(v) => format!("'{}", v),
            Pattern::Fuzzy(v) => v.clone(),
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Boolean expression over indexed fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Term { field: Field, pattern: Pattern },
}

impl Expression {
    fn term(field: Field, pattern: Pattern) -> Self {
        Expression::Term { field, pattern }
    }

    /// Render in the `$and` / `$or` object form, for logging and `--explain`.
    pub fn to_json(&self) -> Value {
        match self {
            Expression::And(children) => {
                json!({ "$and": children.iter().map(Expression::to_json).collect::<Vec<_>>() })
            }
            Expression::Or(children) => {
                json!({ "$or": children.iter().map(Expression::to_json).collect::<Vec<_>>() })
            }
            Expression::Term { field, pattern } => {
                let mut obj = serde_json::Map::new();
                obj.insert(field.name().to_string(), Value::String(pattern.to_syntax()));
                Value::Object(obj)
            }
        }
    }
}

fn exact_group(field: Field, ids: &[String]) -> Option<Expression> {
    let terms: Vec<Expression> = ids
        .iter()
        .filter(|id| !id.is_empty())
        .map(|id| Expression::term(field, Pattern::Exact(id.clone())))
        .collect();
    (!terms.is_empty()).then_some(Expression::Or(terms))
}

/// Compile a structured query into an expression tree.
pub fn compile_query(query: &CatalogQuery) -> Expression {
    let mut groups = Vec::new();

    let keywords: Vec<Expression> = query
        .key_words
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| Expression::term(Field::SearchString, Pattern::Include(k.to_string())))
        .collect();
    if !keywords.is_empty() {
        groups.push(Expression::Or(keywords));
    }

    let text = query.search_text.trim();
    if !text.is_empty() {
        groups.push(Expression::Or(vec![Expression::term(
            Field::SearchString,
            Pattern::Fuzzy(text.to_string()),
        )]));
    }

    groups.extend(exact_group(Field::ClassificationId, &query.classification_ids));
    groups.extend(exact_group(Field::SubClassificationId, &query.sub_classification_ids));
    groups.extend(exact_group(Field::OfficeId, &query.office_ids));

    Expression::And(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_compiles_to_empty_and() {
        assert_eq!(compile_query(&CatalogQuery::default()), Expression::And(vec![]));
    }

    #[test]
    fn test_one_group_per_dimension() {
        let query = CatalogQuery {
            key_words: vec!["saline".into(), "bag".into()],
            search_text: "iv fluid".into(),
            classification_ids: vec!["C1".into()],
            office_ids: vec!["NORTH".into(), "SOUTH".into()],
            ..Default::default()
        };
        let Expression::And(groups) = compile_query(&query) else {
            panic!("expected And");
        };
        assert_eq!(groups.len(), 4);
        assert_eq!(
            groups[2],
            Expression::Or(vec![Expression::Term {
                field: Field::ClassificationId,
                pattern: Pattern::Exact("C1".into()),
            }])
        );
        let Expression::Or(offices) = &groups[3] else {
            panic!("expected Or");
        };
        assert_eq!(offices.len(), 2);
    }

    #[test]
    fn test_to_json_shape() {
        let query = CatalogQuery {
            key_words: vec!["gauze".into()],
            classification_ids: vec!["C1".into()],
            ..Default::default()
        };
        let json = compile_query(&query).to_json();
        assert_eq!(
            json,
            json!({ "$and": [
                { "$or": [ { "searchString": "'gauze" } ] },
                { "$or": [ { "classificationId": "=\"C1\"" } ] }
            ]})
        );
    }

    #[test]
    fn test_pattern_parse() {
        assert_eq!(Pattern::parse("=\"C1\""), Pattern::Exact("C1".into()));
        assert_eq!(Pattern::parse("=C1"), Pattern::Exact("C1".into()));
        assert_eq!(Pattern::parse("'amox"), Pattern::Include("amox".into()));
        assert_eq!(Pattern::parse("amox"), Pattern::Fuzzy("amox".into()));
    }
}
