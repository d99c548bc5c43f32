//! In-memory [`CatalogStore`] implementation for testing.
//!
//! Uses a `BTreeMap` of catalogs behind `std::sync::RwLock`.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Catalog, Catalogs, LinkedItemUpdate};

use super::CatalogStore;

/// In-memory catalog store.
pub struct InMemoryCatalogStore {
    catalogs: RwLock<Catalogs>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            catalogs: RwLock::new(Catalogs::new()),
        }
    }

    /// Snapshot of everything stored.
    pub fn snapshot(&self) -> Catalogs {
        self.catalogs.read().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory catalog store lock poisoned")
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn fetch_catalog(&self, office_id: &str) -> Result<Catalog> {
        let catalogs = self.catalogs.read().map_err(poisoned)?;
        Ok(catalogs.get(office_id).cloned().unwrap_or_default())
    }

    async fn fetch_all_catalogs(&self) -> Result<Catalogs> {
        let catalogs = self.catalogs.read().map_err(poisoned)?;
        Ok(catalogs.clone())
    }

    async fn create_catalog(&self, office_id: &str, catalog: &Catalog) -> Result<()> {
        let mut catalogs = self.catalogs.write().map_err(poisoned)?;
        let stored = catalogs.entry(office_id.to_string()).or_default();
        for (record_id, record) in catalog {
            stored.insert(record_id.clone(), record.clone());
        }
        Ok(())
    }

    async fn apply_link_updates(&self, updates: &[LinkedItemUpdate]) -> Result<()> {
        let mut catalogs = self.catalogs.write().map_err(poisoned)?;
        for update in updates {
            let target = catalogs
                .get_mut(&update.link_to.office_id)
                .and_then(|c| c.get_mut(&update.link_to.record_id));
            match target {
                Some(record) => record.linked_items = update.linked_items.clone(),
                None => tracing::warn!(target_key = %update.link_to, "link update for unknown master record"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemKey, ItemRecord};

    fn one_record(office: &str, id: &str) -> Catalog {
        let record = ItemRecord {
            record_id: id.into(),
            office_id: office.into(),
            ..Default::default()
        };
        Catalog::from([(id.to_string(), record)])
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let store = InMemoryCatalogStore::new();
        store.create_catalog("NORTH", &one_record("NORTH", "r1")).await.unwrap();
        store.create_catalog("NORTH", &one_record("NORTH", "r2")).await.unwrap();

        let catalog = store.fetch_catalog("NORTH").await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(store.fetch_catalog("SOUTH").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_link_updates() {
        let store = InMemoryCatalogStore::new();
        store.create_catalog("MASTER", &one_record("MASTER", "m1")).await.unwrap();

        let update = LinkedItemUpdate {
            link_to: ItemKey::new("MASTER", "m1"),
            linked_items: vec![ItemKey::new("NORTH", "r1")],
        };
        let missing = LinkedItemUpdate {
            link_to: ItemKey::new("MASTER", "nope"),
            linked_items: vec![],
        };
        store.apply_link_updates(&[update, missing]).await.unwrap();

        let master = store.fetch_catalog("MASTER").await.unwrap();
        assert_eq!(master["m1"].linked_items, vec![ItemKey::new("NORTH", "r1")]);
        assert_eq!(master.len(), 1);
    }
}
