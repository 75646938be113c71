//! Infrastructure layer for database connections, parsing, and external integrations
//!
//! This module provides the SQLite product store, HTML extraction for each
//! supported storefront, page rendering over HTTP, configuration and logging.

pub mod config;  // Configuration structures, defaults and file management
pub mod database_connection;
pub mod fixture_renderer;
pub mod http_client;
pub mod logging;  // Logging infrastructure
pub mod parsing;  // Listing, price and specification extraction
pub mod parsing_error;  // Parsing error taxonomy
pub mod product_repository;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, ScraperConfig};
pub use database_connection::DatabaseConnection;
pub use fixture_renderer::FixtureRenderer;
pub use http_client::HttpClient;
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{ParsingError, ParsingResult, ProductDetailParser, ProductListParser, SiteAdapter};
pub use product_repository::SqliteProductStore;
