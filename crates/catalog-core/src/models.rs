//! Core data models used throughout the catalog engine.
//!
//! These types represent the item records, catalogs, run metadata, and
//! search queries that flow through the import and retrieval pipeline.
//! Field names serialize in camelCase so stored JSON matches the document
//! shape used by the external catalog store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record id → item record, scoped to one office.
///
/// Iteration order is the lexical order of record ids. The master-catalog
/// linker relies on this order for its first-match tie-break.
pub type Catalog = BTreeMap<String, ItemRecord>;

/// Office id → catalog.
pub type Catalogs = BTreeMap<String, Catalog>;

/// A weak reference to an item record in some office catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemKey {
    pub office_id: String,
    pub record_id: String,
}

impl ItemKey {
    pub fn new(office_id: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            office_id: office_id.into(),
            record_id: record_id.into(),
        }
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.office_id, self.record_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Active,
    Inactive,
}

/// Canonical item record produced by the row normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemRecord {
    pub record_id: String,
    pub office_id: String,
    pub item_id: String,
    pub classification_id: String,
    pub classification_name: String,
    pub sub_classification_id: String,
    pub sub_classification_name: String,
    pub item_description: String,
    pub definition: String,
    pub item_type: String,
    pub item_type_description: String,
    #[serde(with = "lenient_f64")]
    pub unit_price: f64,
    #[serde(with = "lenient_f64")]
    pub dispensing_fee: f64,
    #[serde(with = "lenient_f64")]
    pub minimum_price: f64,
    #[serde(with = "lenient_f64")]
    pub mark_up_percentage: f64,
    pub status: ItemStatus,
    pub linked_items: Vec<ItemKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_linked_to: Option<ItemKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_mapped_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_linked_timestamp: Option<DateTime<Utc>>,
}

impl ItemRecord {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.office_id, &self.record_id)
    }

    /// True if any numeric field failed to parse during normalization.
    pub fn has_invalid_numbers(&self) -> bool {
        [
            self.unit_price,
            self.dispensing_fee,
            self.minimum_price,
            self.mark_up_percentage,
        ]
        .iter()
        .any(|v| v.is_nan())
    }
}

/// Run-scoped import accumulator.
///
/// Created fresh for each import run and returned to the caller. A pricing
/// row with a non-blank item id lands in exactly one of matched, unmatched,
/// or errored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeCatalogMetadata {
    pub office_id: Option<String>,
    pub last_import_date: DateTime<Utc>,
    pub inventory_items_imported: usize,
    pub pricing_items_imported: usize,
    pub matched_pricing_items: usize,
    pub unmatched_pricing_items: Vec<String>,
    pub errored_pricing_items: Vec<String>,
    pub multiple_pricing_info_items: Vec<String>,
    pub invalid_numeric_fields: Vec<String>,
    pub number_of_items_linked_to_master: usize,
}

impl OfficeCatalogMetadata {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            office_id: None,
            last_import_date: started_at,
            inventory_items_imported: 0,
            pricing_items_imported: 0,
            matched_pricing_items: 0,
            unmatched_pricing_items: Vec::new(),
            errored_pricing_items: Vec::new(),
            multiple_pricing_info_items: Vec::new(),
            invalid_numeric_fields: Vec::new(),
            number_of_items_linked_to_master: 0,
        }
    }
}

/// One pending write to a master record's `linkedItems`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedItemUpdate {
    pub link_to: ItemKey,
    pub linked_items: Vec<ItemKey>,
}

/// Structured search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogQuery {
    pub office_ids: Vec<String>,
    pub classification_ids: Vec<String>,
    /// Display names for `classification_ids`, used for keyword suggestions.
    pub classification_names: Vec<String>,
    pub sub_classification_ids: Vec<String>,
    pub sub_classification_names: Vec<String>,
    pub search_text: String,
    pub key_words: Vec<String>,
    pub exclude_mapped: bool,
    pub exclude_linked: bool,
}

/// A search hit as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub item_id: String,
    pub office_id: String,
    pub record_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQueryResult {
    pub item_keys: Vec<SearchHit>,
    /// Distinct offices among `item_keys`.
    pub matched_catalogs: usize,
    /// Match count before post-filters.
    pub matched_records: usize,
    pub key_words: Vec<String>,
}

/// NaN-tolerant f64 serde: NaN is written as `null` and `null` reads back as NaN.
mod lenient_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
