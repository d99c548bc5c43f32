//! Connection pool for the catalog database.
//!
//! Imports write whole catalogs inside one transaction while searches and
//! `stats` read. WAL lets readers proceed during a write; a second writer
//! waits up to `db.busy_timeout_ms` instead of failing with `SQLITE_BUSY`.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};

use crate::config::Config;

/// Open (creating if needed) the database named by `config.db.path`.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL is durable under WAL except across power loss.
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.db.busy_timeout());

    // Each CLI command runs its statements sequentially.
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open catalog database: {}", db_path.display()))?;

    tracing::debug!(
        path = %db_path.display(),
        busy_timeout_ms = config.db.busy_timeout_ms,
        "connected to catalog database"
    );
    Ok(pool)
}
