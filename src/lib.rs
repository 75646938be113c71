//! Price Scout - E-commerce product discovery and price tracking
//!
//! Discovers product listings on storefronts from a free-text query,
//! normalizes prices and specifications into a canonical [`ProductRecord`],
//! and persists one merged record per product URL.
//!
//! [`ProductRecord`]: domain::product::ProductRecord

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod test_utils;

// Re-export the types most callers need
pub use application::scrape_service::{ScrapeReport, ScrapeService, SiteReport};
pub use domain::merge::merge;
pub use domain::product::{ProductRecord, SiteId, Specifications};
pub use domain::repositories::{ProductStore, StoreError, UpsertOutcome};
pub use domain::services::{PageRenderer, RenderError};
