//! Import orchestration.
//!
//! Sequences a full import run: normalize inventory → merge pricing →
//! promote or link against the master catalog → persist. Every step runs
//! to completion before the next one starts.
//!
//! Fatal problems (missing input, unresolvable office) abort before the
//! store is touched. Row-level pricing problems are recorded in the
//! returned [`OfficeCatalogMetadata`]. The persistence steps are not
//! atomic: if `apply_link_updates` fails after `create_catalog`
//! succeeded, the office catalog is stored with links the master does not
//! know about yet, and the error is returned.

use chrono::Utc;

use crate::error::{CatalogError, Result};
use crate::linker::{coalesce_updates, link_to_master, promote_to_master, MatchStrategy};
use crate::models::OfficeCatalogMetadata;
use crate::normalize::{normalize_inventory, OfficeRegistry, RawRow};
use crate::pricing::merge_pricing;
use crate::store::CatalogStore;

/// Inputs for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub inventory: Option<Vec<RawRow>>,
    pub pricing: Option<Vec<RawRow>>,
    /// Promote the imported catalog to master instead of linking it.
    pub master_catalog: bool,
    pub master_office_id: String,
}

/// Run one import end to end.
pub async fn import_catalog<S: CatalogStore + ?Sized>(
    store: &S,
    registry: &dyn OfficeRegistry,
    strategy: &dyn MatchStrategy,
    request: &ImportRequest,
) -> Result<OfficeCatalogMetadata> {
    let inventory = request
        .inventory
        .as_ref()
        .ok_or(CatalogError::MissingImportFile("inventory"))?;
    let pricing = request
        .pricing
        .as_ref()
        .ok_or(CatalogError::MissingImportFile("pricing"))?;

    let started_at = Utc::now();
    let mut meta = OfficeCatalogMetadata::new(started_at);
    meta.inventory_items_imported = inventory.len();

    // 1. Normalize inventory
    let normalized = normalize_inventory(inventory, registry)?;
    let office_id = normalized.office_id;
    let mut catalog = normalized.catalog;
    meta.office_id = Some(office_id.clone());
    tracing::info!(office = %office_id, rows = inventory.len(), records = catalog.len(), "normalized inventory");

    meta.invalid_numeric_fields = catalog
        .values()
        .filter(|r| r.has_invalid_numbers())
        .map(|r| r.item_id.clone())
        .collect();
    if !meta.invalid_numeric_fields.is_empty() {
        tracing::warn!(
            office = %office_id,
            count = meta.invalid_numeric_fields.len(),
            "inventory rows with non-numeric price fields"
        );
    }

    // 2. Merge pricing
    merge_pricing(&mut catalog, &office_id, pricing, &mut meta);
    tracing::info!(
        office = %office_id,
        matched = meta.matched_pricing_items,
        unmatched = meta.unmatched_pricing_items.len(),
        errored = meta.errored_pricing_items.len(),
        "merged pricing"
    );

    // 3a. Promote to master
    if request.master_catalog {
        let master = promote_to_master(&catalog, &request.master_office_id);
        store
            .create_catalog(&request.master_office_id, &master)
            .await?;
        tracing::info!(master = %request.master_office_id, records = master.len(), "created master catalog");
        return Ok(meta);
    }

    // 3b. Link against the existing master
    let mut master = store.fetch_catalog(&request.master_office_id).await?;
    let updates = link_to_master(&mut catalog, &mut master, strategy, started_at);
    meta.number_of_items_linked_to_master = updates.len();

    // 4. Persist
    store.create_catalog(&office_id, &catalog).await?;
    store.apply_link_updates(&coalesce_updates(updates)).await?;
    tracing::info!(
        office = %office_id,
        linked = meta.number_of_items_linked_to_master,
        "stored catalog and master links"
    );

    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::FirstMatch;
    use crate::normalize::{record_id, StaticOfficeRegistry};
    use crate::store::memory::InMemoryCatalogStore;

    fn registry() -> StaticOfficeRegistry {
        StaticOfficeRegistry::new([("NORTH", "North Clinic")])
    }

    fn inv_row(item_id: &str, description: &str) -> RawRow {
        RawRow::from([
            ("itemId".to_string(), item_id.to_string()),
            ("locationName".to_string(), "North Clinic".to_string()),
            ("description_2".to_string(), description.to_string()),
            ("quantityUnitPrice".to_string(), "2.00".to_string()),
        ])
    }

    fn price_row(item_id: &str, eval_key: &str) -> RawRow {
        RawRow::from([
            ("itemId".to_string(), item_id.to_string()),
            ("eval_key".to_string(), eval_key.to_string()),
        ])
    }

    fn request(inventory: Vec<RawRow>, pricing: Vec<RawRow>, master: bool) -> ImportRequest {
        ImportRequest {
            inventory: Some(inventory),
            pricing: Some(pricing),
            master_catalog: master,
            master_office_id: "MASTER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_files_abort() {
        let store = InMemoryCatalogStore::new();
        let req = ImportRequest {
            inventory: Some(vec![inv_row("1", "Gauze")]),
            ..Default::default()
        };
        let err = import_catalog(&store, &registry(), &FirstMatch, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingImportFile("pricing")));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_office_aborts_before_store() {
        let store = InMemoryCatalogStore::new();
        let mut row = inv_row("1", "Gauze");
        row.insert("locationName".into(), "Elsewhere".into());
        let err = import_catalog(&store, &registry(), &FirstMatch, &request(vec![row], vec![], false))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::OfficeNotFound { .. }));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_promote_then_link() {
        let store = InMemoryCatalogStore::new();

        let meta = import_catalog(
            &store,
            &registry(),
            &FirstMatch,
            &request(vec![inv_row("1", "Gauze"), inv_row("2", "Tape")], vec![], true),
        )
        .await
        .unwrap();
        assert_eq!(meta.inventory_items_imported, 2);
        assert_eq!(store.fetch_catalog("MASTER").await.unwrap().len(), 2);
        assert!(store.fetch_catalog("NORTH").await.unwrap().is_empty());

        let meta = import_catalog(
            &store,
            &registry(),
            &FirstMatch,
            &request(
                vec![inv_row("1", "Gauze"), inv_row("3", "Syringe")],
                vec![
                    price_row("1", "[{quanitytunitprice=4.5, markup=20}]"),
                    price_row("X", "[{quanitytunitprice=1, markup=1}]"),
                ],
                false,
            ),
        )
        .await
        .unwrap();

        assert_eq!(meta.office_id.as_deref(), Some("NORTH"));
        assert_eq!(meta.matched_pricing_items, 1);
        assert_eq!(meta.unmatched_pricing_items, vec!["X".to_string()]);
        assert_eq!(meta.number_of_items_linked_to_master, 1);

        let north = store.fetch_catalog("NORTH").await.unwrap();
        let gauze = &north[&record_id("1", "NORTH")];
        assert_eq!(gauze.unit_price, 4.5);
        assert_eq!(gauze.mark_up_percentage, 20.0);
        let target = gauze.item_linked_to.clone().unwrap();
        assert_eq!(target.office_id, "MASTER");

        let master = store.fetch_catalog("MASTER").await.unwrap();
        let master_gauze = &master[&target.record_id];
        // Promotion back-link plus the new link.
        assert_eq!(master_gauze.linked_items.len(), 2);
        assert!(master_gauze.linked_items.contains(&gauze.key()));
        assert!(north[&record_id("3", "NORTH")].item_linked_to.is_none());
    }

    #[tokio::test]
    async fn test_invalid_numbers_reported() {
        let store = InMemoryCatalogStore::new();
        let mut row = inv_row("1", "Gauze");
        row.insert("quantityUnitPrice".into(), "n/a".into());
        let meta = import_catalog(&store, &registry(), &FirstMatch, &request(vec![row], vec![], false))
            .await
            .unwrap();
        assert_eq!(meta.invalid_numeric_fields, vec!["1".to_string()]);
    }
}
