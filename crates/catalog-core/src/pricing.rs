//! Pricing merger.
//!
//! Pricing exports carry their price data in a semi-structured `eval_key`
//! column holding a list of map literals:
//!
//! ```text
//! [{quanitytunitprice=12.50, markup=35}, {quanitytunitprice=10.00, markup=null}]
//! ```
//!
//! Every `key=value` pair is quoted into `"key":"value"` to obtain JSON,
//! then each entry becomes a [`PriceEntry`]. Only the first entry is
//! applied to the catalog.
//!
//! Row-level failures never abort the merge. Each pricing row with a
//! non-blank item id is counted in exactly one of matched, unmatched, or
//! errored in the run's [`OfficeCatalogMetadata`].

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Catalog, OfficeCatalogMetadata};
use crate::normalize::{parse_number, record_id, RawRow};

/// Column holding the embedded price list.
pub const PRICE_LIST_COLUMN: &str = "eval_key";

static MAP_LITERAL_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)=([^,}\s]+)").expect("static regex"));

/// One price entry parsed out of a pricing row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEntry {
    pub unit_price: f64,
    pub mark_up_percentage: f64,
}

/// Convert a map-literal list into JSON text.
pub fn map_literal_to_json(raw: &str) -> String {
    MAP_LITERAL_PAIR
        .replace_all(raw, "\"$1\":\"$2\"")
        .into_owned()
}

fn price_value(entry: &HashMap<String, serde_json::Value>, key: &str) -> f64 {
    match entry.get(key) {
        Some(serde_json::Value::String(s)) if s == "null" => 0.0,
        Some(serde_json::Value::String(s)) => parse_number(s),
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Parse every price entry embedded in a pricing row.
pub fn parse_price_entries(row: &RawRow) -> anyhow::Result<Vec<PriceEntry>> {
    let raw = row
        .get(PRICE_LIST_COLUMN)
        .ok_or_else(|| anyhow::anyhow!("missing {} column", PRICE_LIST_COLUMN))?;
    let json = map_literal_to_json(raw);
    let entries: Vec<HashMap<String, serde_json::Value>> = serde_json::from_str(&json)?;

    Ok(entries
        .iter()
        .map(|entry| PriceEntry {
            unit_price: price_value(entry, "quanitytunitprice"),
            mark_up_percentage: price_value(entry, "markup"),
        })
        .collect())
}

/// Fold pricing rows into `catalog` for `office_id`, recording outcomes in `meta`.
pub fn merge_pricing(
    catalog: &mut Catalog,
    office_id: &str,
    rows: &[RawRow],
    meta: &mut OfficeCatalogMetadata,
) {
    for row in rows {
        let item_id = match row.get("itemId") {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => continue,
        };
        meta.pricing_items_imported += 1;

        let entries = match parse_price_entries(row) {
            Ok(entries) if !entries.is_empty() => entries,
            Ok(_) => {
                tracing::warn!(item_id = %item_id, "pricing row has an empty price list");
                meta.errored_pricing_items.push(item_id);
                continue;
            }
            Err(e) => {
                tracing::warn!(item_id = %item_id, error = %e, "could not parse pricing row");
                meta.errored_pricing_items.push(item_id);
                continue;
            }
        };

        let key = record_id(&item_id, office_id);
        let Some(record) = catalog.get_mut(&key) else {
            meta.unmatched_pricing_items.push(item_id);
            continue;
        };

        if entries.len() > 1 {
            meta.multiple_pricing_info_items.push(item_id.clone());
        }
        let pricing = entries[0];
        record.unit_price = pricing.unit_price;
        record.mark_up_percentage = pricing.mark_up_percentage;
        meta.matched_pricing_items += 1;
    }
}
