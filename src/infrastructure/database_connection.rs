// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Products table, keyed by url; specifications stored as JSON text
pub const CREATE_PRODUCTS_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS products (
        url TEXT PRIMARY KEY NOT NULL,
        source_website TEXT NOT NULL,
        product_name TEXT NOT NULL,
        price REAL NOT NULL,
        currency TEXT NOT NULL DEFAULT 'EGP',
        specifications TEXT NOT NULL DEFAULT '{}',
        is_available INTEGER NOT NULL DEFAULT 1,
        scraped_at TEXT NOT NULL
    )
";

pub const CREATE_PRODUCTS_INDEXES_SQL: &str = r"
    CREATE INDEX IF NOT EXISTS idx_products_source_website ON products (source_website);
    CREATE INDEX IF NOT EXISTS idx_products_scraped_at ON products (scraped_at);
";

/// Idempotent schema creation on any SQLite executor
pub async fn apply_schema<'e, E>(executor: E) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite> + Copy,
{
    executor.execute(CREATE_PRODUCTS_SQL).await?;
    executor.execute(CREATE_PRODUCTS_INDEXES_SQL).await?;
    Ok(())
}

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
                }
            }
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database; keep exactly one
        let max_connections = if in_memory { 1 } else { 5 };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            // Reaping the only connection would drop the database with it
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to {database_url}"))?;

        debug!("Connected to {} ({} max connections)", database_url, max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        apply_schema(&self.pool).await.context("Failed to create products schema")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_database_connection_creates_file() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("nested").join("test.db");
        let database_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseConnection::new(&database_url).await?;
        assert!(!db.pool().is_closed());
        assert!(db_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() -> Result<()> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        db.migrate().await?;
        db.migrate().await?;

        let result = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='products'")
            .fetch_optional(db.pool())
            .await?;
        assert!(result.is_some());
        Ok(())
    }
}
