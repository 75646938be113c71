//! Domain module - Core business logic and entities
//!
//! Contains the canonical product record, the merge policy applied when the
//! same product is observed again, and the trait seams for the external
//! collaborators (page renderer, product store).

pub mod product;
pub mod merge;
pub mod repositories;
pub mod services;

// Re-export commonly used items for convenience
pub use merge::merge;
pub use product::{ProductRecord, SiteId, Specifications};
pub use repositories::{ProductStore, StoreError, UpsertOutcome};
pub use services::{PageRenderer, RenderError};
