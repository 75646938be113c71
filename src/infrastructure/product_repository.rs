//! SQLite product store
//!
//! One row per product URL. `upsert` serializes read-merge-write per url
//! with an in-process async lock and runs it inside an immediate
//! transaction, so two concurrent observations of the same product never
//! overwrite each other's specifications and writers to different urls
//! queue on SQLite's write lock instead of failing.

#![allow(clippy::uninlined_format_args)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::domain::merge::merge;
use crate::domain::product::{ProductRecord, Specifications};
use crate::domain::repositories::{ProductStore, StoreError, UpsertOutcome};
use crate::infrastructure::database_connection::apply_schema;

const SELECT_COLUMNS: &str =
    "url, source_website, product_name, price, currency, specifications, is_available, scraped_at";

const UPSERT_SQL: &str = r"
    INSERT INTO products
    (url, source_website, product_name, price, currency, specifications, is_available, scraped_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(url) DO UPDATE SET
        source_website = excluded.source_website,
        product_name = excluded.product_name,
        price = excluded.price,
        currency = excluded.currency,
        specifications = excluded.specifications,
        is_available = excluded.is_available,
        scraped_at = excluded.scraped_at
";

type UrlLock = Arc<tokio::sync::Mutex<()>>;

/// Handle on one url's lock; the map entry goes away with the last handle,
/// including handles dropped while still waiting
struct UrlLease<'a> {
    locks: &'a Mutex<HashMap<String, UrlLock>>,
    url: String,
    lock: UrlLock,
}

impl Drop for UrlLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.url);
        }
    }
}

pub struct SqliteProductStore {
    pool: Arc<SqlitePool>,
    url_locks: Mutex<HashMap<String, UrlLock>>,
}

impl SqliteProductStore {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self {
            pool,
            url_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn url_lock(&self, url: &str) -> UrlLease<'_> {
        let mut locks = self.url_locks.lock().unwrap_or_else(PoisonError::into_inner);
        UrlLease {
            locks: &self.url_locks,
            url: url.to_string(),
            lock: Arc::clone(locks.entry(url.to_string()).or_default()),
        }
    }

    async fn merge_and_write(&self, record: &ProductRecord) -> Result<UpsertOutcome, StoreError> {
        // Take the write lock before reading; a deferred read snapshot cannot
        // be upgraded once another connection has committed
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| StoreError::database("begin", e))?;

        let existing = fetch_record(&mut *tx, &record.url).await?;
        let outcome = if existing.is_some() {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };

        let merged = merge(existing.as_ref(), record.clone());
        let specifications = serde_json::to_string(&merged.specifications).map_err(|e| StoreError::Serialization {
            url: merged.url.clone(),
            source: e,
        })?;

        sqlx::query(UPSERT_SQL)
            .bind(&merged.url)
            .bind(&merged.source_website)
            .bind(&merged.product_name)
            .bind(merged.price)
            .bind(&merged.currency)
            .bind(specifications)
            .bind(merged.is_available)
            .bind(merged.scraped_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::database("upsert", e))?;

        tx.commit().await.map_err(|e| StoreError::database("commit", e))?;

        debug!(
            "{:?} {} ({} specifications)",
            outcome,
            merged.url,
            merged.specifications.len()
        );
        Ok(outcome)
    }
}

async fn fetch_record<'e, E>(executor: E, url: &str) -> Result<Option<ProductRecord>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM products WHERE url = ?", SELECT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(url)
        .fetch_optional(executor)
        .await
        .map_err(|e| StoreError::database("find_by_url", e))?;

    row.as_ref().map(record_from_row).transpose()
}

fn record_from_row(row: &SqliteRow) -> Result<ProductRecord, StoreError> {
    let column = |e| StoreError::database("decode", e);

    let url: String = row.try_get("url").map_err(column)?;
    let raw_specs: String = row.try_get("specifications").map_err(column)?;
    let specifications: Specifications =
        serde_json::from_str(&raw_specs).map_err(|e| StoreError::Serialization {
            url: url.clone(),
            source: e,
        })?;
    let scraped_at: DateTime<Utc> = row.try_get("scraped_at").map_err(column)?;

    Ok(ProductRecord {
        source_website: row.try_get("source_website").map_err(column)?,
        product_name: row.try_get("product_name").map_err(column)?,
        price: row.try_get("price").map_err(column)?,
        currency: row.try_get("currency").map_err(column)?,
        is_available: row.try_get("is_available").map_err(column)?,
        specifications,
        scraped_at,
        url,
    })
}

#[async_trait]
impl ProductStore for SqliteProductStore {
    async fn init(&self) -> Result<(), StoreError> {
        apply_schema(&*self.pool)
            .await
            .map_err(|e| StoreError::database("init", e))
    }

    async fn upsert(&self, record: &ProductRecord) -> Result<UpsertOutcome, StoreError> {
        if !record.is_valid() {
            return Err(StoreError::InvalidRecord {
                url: record.url.clone(),
                reason: "a record needs a url, a name and a positive price".to_string(),
            });
        }

        let lease = self.url_lock(&record.url);
        let _guard = lease.lock.lock().await;
        self.merge_and_write(record).await
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<ProductRecord>, StoreError> {
        fetch_record(&*self.pool, url).await
    }

    async fn list_products(&self, limit: u32) -> Result<Vec<ProductRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM products ORDER BY scraped_at DESC, url ASC LIMIT ?",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StoreError::database("list_products", e))?;

        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| StoreError::database("count", e))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    async fn file_store() -> (TempDir, Arc<SqliteProductStore>) {
        let dir = tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("products.db").display());
        let db = DatabaseConnection::new(&url).await.unwrap();
        let store = SqliteProductStore::new(Arc::new(db.into_pool()));
        store.init().await.unwrap();
        (dir, Arc::new(store))
    }

    fn laptop(price: f64, specs: &[(&str, &str)]) -> ProductRecord {
        let specifications = specs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        ProductRecord::new(
            "https://btech.com/en/p/ideapad-slim-3",
            "B.TECH",
            "Lenovo IdeaPad Slim 3",
            price,
            "EGP",
        )
        .with_specifications(specifications)
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let (_dir, store) = file_store().await;
        store.init().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_merges() {
        let (_dir, store) = file_store().await;

        let first = laptop(21999.0, &[("RAM", "8GB")]);
        assert_eq!(store.upsert(&first).await.unwrap(), UpsertOutcome::Inserted);

        let mut second = laptop(20499.0, &[("Storage", "512GB"), ("RAM", "16GB")]);
        second.source_website = "Somewhere else".to_string();
        assert_eq!(store.upsert(&second).await.unwrap(), UpsertOutcome::Updated);

        let stored = store.find_by_url(&first.url).await.unwrap().unwrap();
        assert_eq!(stored.price, 20499.0);
        assert_eq!(stored.source_website, "B.TECH");
        assert_eq!(stored.specifications.len(), 2);
        assert_eq!(stored.specifications["RAM"], "16GB");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_fields() {
        let (_dir, store) = file_store().await;
        let scraped_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        let record = laptop(18750.5, &[("Operating System", "Windows 11 Home")]).with_scraped_at(scraped_at);

        store.upsert(&record).await.unwrap();
        let stored = store.find_by_url(&record.url).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_invalid_record_is_rejected() {
        let (_dir, store) = file_store().await;
        let result = store.upsert(&laptop(0.0, &[])).await;

        assert!(matches!(result, Err(StoreError::InvalidRecord { .. })));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_keep_every_specification() {
        let (_dir, store) = file_store().await;

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let key = format!("Attribute {i:02}");
                    let record = laptop(20000.0 + f64::from(i), &[(key.as_str(), "yes")]);
                    store.upsert(&record).await
                })
            })
            .collect();

        let mut inserted = 0;
        for task in futures::future::join_all(tasks).await {
            if task.unwrap().unwrap() == UpsertOutcome::Inserted {
                inserted += 1;
            }
        }

        let stored = store
            .find_by_url("https://btech.com/en/p/ideapad-slim-3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(stored.specifications.len(), 16);
        assert!(store.url_locks.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_upserts_to_different_urls_all_land() {
        let (_dir, store) = file_store().await;

        for round in 0..5 {
            let tasks: Vec<_> = (0..20)
                .map(|i| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        let url = format!("https://btech.com/en/p/lenovo-{i:02}");
                        let key = format!("Round {round}");
                        let record = ProductRecord::new(url, "B.TECH", "Lenovo IdeaPad", 15000.0 + f64::from(i), "EGP")
                            .with_specifications(Specifications::from([(key, "seen".to_string())]));
                        store.upsert(&record).await
                    })
                })
                .collect();

            for task in futures::future::join_all(tasks).await {
                task.unwrap().unwrap();
            }
        }

        assert_eq!(store.count().await.unwrap(), 20);
        let stored = store.find_by_url("https://btech.com/en/p/lenovo-07").await.unwrap().unwrap();
        assert_eq!(stored.specifications.len(), 5);
        assert!(store.url_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_upsert_releases_its_lock_entry() {
        let (_dir, store) = file_store().await;
        let record = laptop(21999.0, &[]);

        let holder = store.url_lock(&record.url);
        let held = holder.lock.lock().await;

        // Dropped while still waiting for the url lock
        let waited = tokio::time::timeout(Duration::from_millis(20), store.upsert(&record)).await;
        assert!(waited.is_err());
        assert_eq!(store.url_locks.lock().unwrap().len(), 1);

        drop(held);
        drop(holder);
        assert!(store.url_locks.lock().unwrap().is_empty());

        assert_eq!(store.upsert(&record).await.unwrap(), UpsertOutcome::Inserted);
        assert!(store.url_locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_products_newest_first() {
        let (_dir, store) = file_store().await;
        let older = ProductRecord::new("https://www.amazon.eg/dp/A", "Amazon Egypt", "Lenovo A", 100.0, "EGP")
            .with_scraped_at(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let newer = ProductRecord::new("https://www.amazon.eg/dp/B", "Amazon Egypt", "Lenovo B", 200.0, "EGP")
            .with_scraped_at(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());

        store.upsert(&older).await.unwrap();
        store.upsert(&newer).await.unwrap();

        let listed = store.list_products(10).await.unwrap();
        assert_eq!(listed.iter().map(|r| r.url.as_str()).collect::<Vec<_>>(), vec![newer.url.as_str(), older.url.as_str()]);
        assert_eq!(store.list_products(1).await.unwrap().len(), 1);
    }
}
