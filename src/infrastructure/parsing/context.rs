//! Parse contexts threaded through the contextual parsers

use url::Url;

use crate::domain::product::{SiteId, DEFAULT_CURRENCY, DEFAULT_MAX_RESULTS};

/// Per-call inputs for listing extraction
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub site: SiteId,
    pub query: String,
    pub base_url: Url,
    pub max_results: usize,
    pub default_currency: String,
    pub source_website: String,
}

impl SearchContext {
    pub fn new(site: SiteId, query: impl Into<String>, base_url: Url) -> Self {
        Self {
            site,
            query: query.into(),
            base_url,
            max_results: DEFAULT_MAX_RESULTS,
            default_currency: DEFAULT_CURRENCY.to_string(),
            source_website: site.label().to_string(),
        }
    }

    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_source_website(mut self, label: impl Into<String>) -> Self {
        self.source_website = label.into();
        self
    }
}

/// Detail page being parsed; used for log context
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    pub site: SiteId,
    pub url: String,
}

impl DetailParseContext {
    pub fn new(site: SiteId, url: impl Into<String>) -> Self {
        Self { site, url: url.into() }
    }
}
