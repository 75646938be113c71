//! Repository interfaces for product persistence
//!
//! The store owns url uniqueness: the pipeline submits every successful
//! observation and relies on upsert-by-url semantics downstream.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::product::ProductRecord;

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation '{operation}' failed: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to (de)serialize specifications for {url}: {source}")]
    Serialization {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Rejected record {url}: {reason}")]
    InvalidRecord { url: String, reason: String },
}

impl StoreError {
    pub const fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database { operation, source }
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Create the backing schema; safe to call repeatedly
    async fn init(&self) -> Result<(), StoreError>;

    /// Read existing -> merge -> write, atomically per url
    async fn upsert(&self, record: &ProductRecord) -> Result<UpsertOutcome, StoreError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<ProductRecord>, StoreError>;

    /// Most recently scraped first
    async fn list_products(&self, limit: u32) -> Result<Vec<ProductRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}
