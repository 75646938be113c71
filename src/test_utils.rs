//! Test utilities for Price Scout
//!
//! Provides isolated in-memory stores and a fixture-backed scrape service
//! so tests never touch the network or a shared database file.

use anyhow::Result;
use std::sync::Arc;

use crate::application::scrape_service::ScrapeService;
use crate::domain::repositories::ProductStore;
use crate::infrastructure::config::ScraperConfig;
use crate::infrastructure::{DatabaseConnection, FixtureRenderer, SqliteProductStore};

/// Test database configuration
pub struct TestDatabase {
    pub connection: DatabaseConnection,
}

impl TestDatabase {
    /// Create a new in-memory test database
    ///
    /// Each test gets a fresh, clean database state.
    pub async fn new() -> Result<Self> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        db.migrate().await?;
        Ok(Self { connection: db })
    }

    /// Get the database pool for use in repositories
    pub fn pool(&self) -> sqlx::Pool<sqlx::Sqlite> {
        self.connection.pool().clone()
    }
}

/// Store, fixture renderer and service wired together
pub struct TestContext {
    pub database: TestDatabase,
    pub store: Arc<SqliteProductStore>,
    pub renderer: Arc<FixtureRenderer>,
    pub service: ScrapeService,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        Self::with_config(&ScraperConfig::default()).await
    }

    /// Pages registered on `renderer` after construction are still served
    pub async fn with_config(config: &ScraperConfig) -> Result<Self> {
        let database = TestDatabase::new().await?;
        let store = Arc::new(SqliteProductStore::new(Arc::new(database.pool())));
        store.init().await?;

        let renderer = Arc::new(FixtureRenderer::new());
        let service = ScrapeService::new(renderer.clone(), store.clone(), config)?;

        Ok(Self {
            database,
            store,
            renderer,
            service,
        })
    }
}

/// Helper macros for common test patterns
#[macro_export]
macro_rules! test_context {
    () => {{
        $crate::test_utils::TestContext::new().await.expect("Failed to create test context")
    }};
}

#[macro_export]
macro_rules! test_db {
    () => {{
        $crate::test_utils::TestDatabase::new().await.expect("Failed to create test database")
    }};
}
