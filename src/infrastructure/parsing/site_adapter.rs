//! Per-site adapter: one listing parser and one specification parser
//! built from a [`SiteProfile`]
//!
//! Takes markup as `&str` and parses it internally, so callers on async
//! tasks never hold a parsed document across an await point.

use scraper::Html;
use tracing::debug;
use url::Url;

use super::config::SiteProfile;
use super::context::{DetailParseContext, SearchContext};
use super::price::PriceScanner;
use super::product_detail_parser::ProductDetailParser;
use super::product_list_parser::ProductListParser;
use super::relevance::RelevanceFilter;
use super::{ContextualParser, ParsingResult};
use crate::domain::product::{ProductRecord, SiteId, Specifications};
use crate::infrastructure::config::ScraperConfig;

pub struct SiteAdapter {
    profile: SiteProfile,
    base_url: Url,
    max_results: usize,
    default_currency: String,
    listing: ProductListParser,
    details: ProductDetailParser,
}

impl SiteAdapter {
    pub fn new(profile: SiteProfile, config: &ScraperConfig) -> ParsingResult<Self> {
        profile.validate()?;

        let scanner = PriceScanner::new(&config.currency_markers)?;
        let relevance = RelevanceFilter::from_config(config);
        let listing = ProductListParser::new(&profile.listing, relevance, scanner)?;
        let details = ProductDetailParser::new(&profile.specifications)?;

        debug!(
            "Built {} adapter with {} specification strategies",
            profile.label,
            details.strategy_count()
        );

        Ok(Self {
            base_url: profile.base()?,
            max_results: config.max_results,
            default_currency: config.default_currency.clone(),
            profile,
            listing,
            details,
        })
    }

    pub const fn site(&self) -> SiteId {
        self.profile.site
    }

    pub fn label(&self) -> &str {
        &self.profile.label
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub fn search_url(&self, query: &str) -> String {
        self.profile.search_url(query)
    }

    /// Relevant, priced candidates from a rendered search results page
    pub fn extract_listings(&self, markup: &str, query: &str) -> ParsingResult<Vec<ProductRecord>> {
        let html = Html::parse_document(markup);
        let context = SearchContext::new(self.profile.site, query, self.base_url.clone())
            .with_max_results(self.max_results)
            .with_default_currency(self.default_currency.clone())
            .with_source_website(self.profile.label.clone());
        self.listing.parse_with_context(&html, &context)
    }

    /// Specifications from a rendered product detail page; empty when no
    /// known structure is present
    pub fn extract_specs(&self, markup: &str, url: &str) -> ParsingResult<Specifications> {
        let html = Html::parse_document(markup);
        let context = DetailParseContext::new(self.profile.site, url);
        self.details.parse_with_context(&html, &context)
    }
}
