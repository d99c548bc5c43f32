//! SQLite-backed [`CatalogStore`] implementation.
//!
//! Each item record is one row of `catalog_items`, keyed by
//! `(office_id, record_id)`, with the full record serialized as JSON.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use catalog_core::models::{Catalog, Catalogs, ItemRecord, LinkedItemUpdate};
use catalog_core::store::CatalogStore;

use crate::config::Config;
use crate::db;

/// SQLite implementation of the [`CatalogStore`] trait.
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database named in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(db::connect(config).await?))
    }

    /// Wait for in-flight statements and close every connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Fetch a single record.
    pub async fn get_record(&self, office_id: &str, record_id: &str) -> Result<Option<ItemRecord>> {
        let row = sqlx::query(
            "SELECT record_json FROM catalog_items WHERE office_id = ? AND record_id = ?",
        )
        .bind(office_id)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| decode_record(&r.get::<String, _>("record_json")))
            .transpose()
    }

    /// Latest `updated_at` (unix seconds) per office.
    pub async fn last_write_times(&self) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query(
            "SELECT office_id, MAX(updated_at) AS last_write FROM catalog_items GROUP BY office_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("office_id"), row.get("last_write")))
            .collect())
    }
}

fn decode_record(json: &str) -> Result<ItemRecord> {
    serde_json::from_str(json).context("Failed to decode stored item record")
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn fetch_catalog(&self, office_id: &str) -> Result<Catalog> {
        let rows = sqlx::query(
            "SELECT record_json FROM catalog_items WHERE office_id = ? ORDER BY record_id",
        )
        .bind(office_id)
        .fetch_all(&self.pool)
        .await?;

        let mut catalog = Catalog::new();
        for row in rows {
            let record = decode_record(&row.get::<String, _>("record_json"))?;
            catalog.insert(record.record_id.clone(), record);
        }
        Ok(catalog)
    }

    async fn fetch_all_catalogs(&self) -> Result<Catalogs> {
        let rows = sqlx::query(
            "SELECT office_id, record_json FROM catalog_items ORDER BY office_id, record_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut catalogs = Catalogs::new();
        for row in rows {
            let office_id: String = row.get("office_id");
            let record = decode_record(&row.get::<String, _>("record_json"))?;
            catalogs
                .entry(office_id)
                .or_default()
                .insert(record.record_id.clone(), record);
        }
        Ok(catalogs)
    }

    async fn create_catalog(&self, office_id: &str, catalog: &Catalog) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (record_id, record) in catalog {
            let json = serde_json::to_string(record)?;
            sqlx::query(
                r#"
                INSERT INTO catalog_items (office_id, record_id, item_id, record_json, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(office_id, record_id) DO UPDATE SET
                    item_id = excluded.item_id,
                    record_json = excluded.record_json,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(office_id)
            .bind(record_id)
            .bind(&record.item_id)
            .bind(&json)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(office = %office_id, records = catalog.len(), "stored catalog");
        Ok(())
    }

    async fn apply_link_updates(&self, updates: &[LinkedItemUpdate]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for update in updates {
            let key = &update.link_to;
            let row = sqlx::query(
                "SELECT record_json FROM catalog_items WHERE office_id = ? AND record_id = ?",
            )
            .bind(&key.office_id)
            .bind(&key.record_id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                tracing::warn!(master = %key, "link update for unknown master record");
                continue;
            };

            let mut record = decode_record(&row.get::<String, _>("record_json"))?;
            record.linked_items = update.linked_items.clone();

            sqlx::query(
                "UPDATE catalog_items SET record_json = ?, updated_at = ? WHERE office_id = ? AND record_id = ?",
            )
            .bind(serde_json::to_string(&record)?)
            .bind(now)
            .bind(&key.office_id)
            .bind(&key.record_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::apply_schema;
    use catalog_core::models::ItemKey;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteCatalogStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        apply_schema(&pool).await.unwrap();
        SqliteCatalogStore::new(pool)
    }

    fn record(office: &str, id: &str) -> ItemRecord {
        ItemRecord {
            record_id: format!("r{}", id),
            office_id: office.into(),
            item_id: id.into(),
            item_description: format!("Item {}", id),
            unit_price: f64::NAN,
            ..Default::default()
        }
    }

    fn catalog(records: Vec<ItemRecord>) -> Catalog {
        records
            .into_iter()
            .map(|r| (r.record_id.clone(), r))
            .collect()
    }

    #[tokio::test]
    async fn test_open_on_migrated_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config: Config = toml::from_str(&format!(
            "[db]\npath = \"{}/catalog.sqlite\"\n",
            tmp.path().display()
        ))
        .unwrap();
        crate::migrate::run_migrations(&config).await.unwrap();

        let store = SqliteCatalogStore::open(&config).await.unwrap();
        store
            .create_catalog("HQ", &catalog(vec![record("HQ", "1")]))
            .await
            .unwrap();
        store.close().await;

        let reopened = SqliteCatalogStore::open(&config).await.unwrap();
        assert_eq!(reopened.fetch_catalog("HQ").await.unwrap().len(), 1);
        assert!(reopened.get_record("HQ", "r1").await.unwrap().is_some());
        assert!(reopened.last_write_times().await.unwrap().contains_key("HQ"));
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = store().await;
        store
            .create_catalog("NORTH", &catalog(vec![record("NORTH", "1"), record("NORTH", "2")]))
            .await
            .unwrap();

        let fetched = store.fetch_catalog("NORTH").await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert!(fetched["r1"].unit_price.is_nan());
        assert_eq!(fetched["r2"].item_description, "Item 2");

        let all = store.fetch_all_catalogs().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(store.fetch_catalog("SOUTH").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_is_upsert() {
        let store = store().await;
        store
            .create_catalog("NORTH", &catalog(vec![record("NORTH", "1")]))
            .await
            .unwrap();
        let mut changed = record("NORTH", "1");
        changed.item_description = "Renamed".into();
        store
            .create_catalog("NORTH", &catalog(vec![changed]))
            .await
            .unwrap();

        let fetched = store.fetch_catalog("NORTH").await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched["r1"].item_description, "Renamed");
    }

    #[tokio::test]
    async fn test_apply_link_updates() {
        let store = store().await;
        store
            .create_catalog("MASTER", &catalog(vec![record("MASTER", "9")]))
            .await
            .unwrap();

        let updates = vec![
            LinkedItemUpdate {
                link_to: ItemKey::new("MASTER", "r9"),
                linked_items: vec![ItemKey::new("NORTH", "r1")],
            },
            LinkedItemUpdate {
                link_to: ItemKey::new("MASTER", "missing"),
                linked_items: vec![],
            },
        ];
        store.apply_link_updates(&updates).await.unwrap();

        let master = store.get_record("MASTER", "r9").await.unwrap().unwrap();
        assert_eq!(master.linked_items, vec![ItemKey::new("NORTH", "r1")]);
        assert!(store.get_record("MASTER", "missing").await.unwrap().is_none());
    }
}
