//! Row normalizer: raw imported rows → canonical [`ItemRecord`]s.
//!
//! Rows arrive as string-keyed maps whose headers have already been passed
//! through [`rename_header`]. Each row becomes one record whose `recordId`
//! is a deterministic hash of `itemId` + `officeId`, so importing the same
//! row twice lands in the same catalog slot.
//!
//! Numeric columns are parsed permissively: the longest leading numeric
//! prefix is used and anything unparseable becomes `NaN`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, Result};
use crate::models::{Catalog, ItemRecord, ItemStatus};

/// One parsed row from an import file, keyed by canonical column name.
pub type RawRow = HashMap<String, String>;

/// External column spelling → canonical field name.
///
/// Headers not listed here pass through unchanged (`description`,
/// `description_1`, … keep their export names).
pub const HEADER_RENAMES: &[(&str, &str)] = &[
    ("classid", "classificationId"),
    ("subclassid", "subClassificationId"),
    ("invoiceitemid", "itemId"),
    ("invoicedescription", "invoiceDescription"),
    ("itemtype", "itemType"),
    ("quantityfrom", "quantityFrom"),
    ("quanitytunitprice", "quantityUnitPrice"),
    ("dispensingfee", "dispensingFee"),
    ("minimumprice", "minimumPrice"),
    ("markup", "markUpPercentage"),
    ("qualityunityprice", "unitPrice"),
    ("qualityfrom", "quantityFrom"),
    ("name1", "locationName"),
    ("revenue_id", "revenueId"),
    ("allow_price_chg", "allowPriceChange"),
    ("nbr_disp", "numberOfDisp"),
    ("status", "status"),
];

/// Translate an external header to its canonical field name.
pub fn rename_header(header: &str) -> String {
    HEADER_RENAMES
        .iter()
        .find(|(from, _)| *from == header)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| header.to_string())
}

/// Resolves office display names to office ids.
pub trait OfficeRegistry: Send + Sync {
    /// Case-insensitive lookup of an office by display name.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Fixed list of `(office_id, name)` pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticOfficeRegistry {
    offices: Vec<(String, String)>,
}

impl StaticOfficeRegistry {
    pub fn new<I, A, B>(offices: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            offices: offices
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }
}

impl OfficeRegistry for StaticOfficeRegistry {
    fn resolve(&self, name: &str) -> Option<String> {
        let wanted = name.trim().to_lowercase();
        self.offices
            .iter()
            .find(|(_, office_name)| office_name.to_lowercase() == wanted)
            .map(|(id, _)| id.clone())
    }
}

/// Deterministic record id for an `(itemId, officeId)` pair.
pub fn record_id(item_id: &str, office_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(office_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(item_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..20].to_string()
}

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("static regex")
});

/// Parse the leading numeric prefix of `raw`; `NaN` when there is none.
pub fn parse_number(raw: &str) -> f64 {
    LEADING_NUMBER
        .find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn parse_status(raw: Option<&str>) -> ItemStatus {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("inactive") | Some("false") | Some("0") | Some("n") => ItemStatus::Inactive,
        _ => ItemStatus::Active,
    }
}

fn field(row: &RawRow, name: &str) -> String {
    row.get(name).cloned().unwrap_or_default()
}

/// Resolve the office a row belongs to via its `locationName` column.
pub fn resolve_office(row: &RawRow, registry: &dyn OfficeRegistry) -> Result<String> {
    let location = field(row, "locationName");
    registry
        .resolve(&location)
        .ok_or(CatalogError::OfficeNotFound { location })
}

/// Normalize one inventory row.
///
/// Returns `Ok(None)` for rows with a blank `itemId`, which are skipped
/// without consulting the office registry.
pub fn normalize_row(row: &RawRow, registry: &dyn OfficeRegistry) -> Result<Option<ItemRecord>> {
    let item_id = field(row, "itemId");
    if item_id.trim().is_empty() {
        return Ok(None);
    }
    let office_id = resolve_office(row, registry)?;

    let item_type_description = match field(row, "description_3") {
        s if s == "[None]" => String::new(),
        s => s,
    };

    Ok(Some(ItemRecord {
        record_id: record_id(&item_id, &office_id),
        office_id,
        item_id,
        classification_id: field(row, "classificationId"),
        classification_name: field(row, "description"),
        sub_classification_id: field(row, "subClassificationId"),
        sub_classification_name: field(row, "description_1"),
        item_description: field(row, "description_2"),
        definition: field(row, "invoiceDescription"),
        item_type: field(row, "itemType"),
        item_type_description,
        unit_price: parse_number(&field(row, "quantityUnitPrice")),
        dispensing_fee: parse_number(&field(row, "dispensingFee")),
        minimum_price: parse_number(&field(row, "minimumPrice")),
        mark_up_percentage: 0.0,
        status: parse_status(row.get("status").map(String::as_str)),
        ..Default::default()
    }))
}

/// Result of normalizing a full inventory file.
#[derive(Debug, Clone)]
pub struct NormalizedInventory {
    pub office_id: String,
    pub catalog: Catalog,
}

/// Normalize every inventory row into one office catalog.
///
/// The office is taken from the first row, even when that row is itself
/// skipped for a blank item id. Any row whose office cannot be resolved
/// fails the whole batch before a catalog is returned. A later row with
/// the same item id overwrites the earlier one.
pub fn normalize_inventory(rows: &[RawRow], registry: &dyn OfficeRegistry) -> Result<NormalizedInventory> {
    let first = rows.first().ok_or(CatalogError::NoCatalog)?;
    let office_id = resolve_office(first, registry)?;

    let mut catalog = Catalog::new();
    for row in rows {
        if let Some(record) = normalize_row(row, registry)? {
            if catalog.insert(record.record_id.clone(), record).is_some() {
                tracing::debug!(office = %office_id, "duplicate inventory row overwrote an earlier slot");
            }
        }
    }

    Ok(NormalizedInventory { office_id, catalog })
}
