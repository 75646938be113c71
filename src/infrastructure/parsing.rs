//! HTML extraction for storefront pages
//!
//! Listing cards become [`ProductRecord`]s through the relevance filter and
//! price normalizer; product detail pages become [`Specifications`] through
//! a prioritized fallback chain of strategies.
//!
//! [`ProductRecord`]: crate::domain::product::ProductRecord
//! [`Specifications`]: crate::domain::product::Specifications

pub mod error;
pub mod config;
pub mod context;
pub mod text;
pub mod relevance;
pub mod price;
pub mod product_list_parser;
pub mod product_detail_parser;
pub mod site_adapter;

// Re-export public types
pub use error::{ParsingError, ParsingResult};
pub use config::{ListingSelectors, PriceSource, SiteProfile, SpecStrategy};
pub use context::{DetailParseContext, SearchContext};
pub use price::{parse_price, CurrencyMarker, PriceScanner, ScannedPrice};
pub use relevance::RelevanceFilter;
pub use product_list_parser::ProductListParser;
pub use product_detail_parser::ProductDetailParser;
pub use site_adapter::SiteAdapter;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// Enhanced parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output>;
}

/// Compile fallback selector strings, skipping (and logging) any that fail.
///
/// Errors only when nothing in a non-empty list compiles.
pub(crate) fn compile_selectors(field: &str, selector_strings: &[String]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile {} selector '{}': {}", field, selector_str, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() && !selector_strings.is_empty() {
        return Err(ParsingError::invalid_selector(field, &errors.join(", ")));
    }

    if !errors.is_empty() {
        debug!("Some {} selectors failed to compile: {}", field, errors.join(", "));
    }

    Ok(selectors)
}

pub(crate) fn compile_selector(field: &str, selector_str: &str) -> ParsingResult<Selector> {
    Selector::parse(selector_str)
        .map_err(|e| ParsingError::invalid_selector(selector_str, &format!("{field}: {e}")))
}

/// First element matched by any selector in order
pub(crate) fn select_first<'a>(scope: &ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|selector| scope.select(selector).next())
}
