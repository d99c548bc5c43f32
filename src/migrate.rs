use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // One row per item record; the full record is stored as JSON
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_items (
            office_id TEXT NOT NULL,
            record_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            record_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (office_id, record_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_catalog_items_item_id ON catalog_items(office_id, item_id)")
        .execute(pool)
        .await?;

    Ok(())
}
