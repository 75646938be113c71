//! Application layer module
//!
//! Orchestrates search, detail-page enrichment and persistence across the
//! configured storefronts.

pub mod scrape_service;
