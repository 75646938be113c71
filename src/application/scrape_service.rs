//! Scrape pipeline: search -> deep dive -> upsert
//!
//! Each site is processed independently and concurrently. Render and
//! parse failures degrade to empty results with a log line naming the
//! query or URL; store failures are collected in the report so the caller
//! can surface them.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::product::{ProductRecord, SiteId, Specifications};
use crate::domain::repositories::{ProductStore, UpsertOutcome};
use crate::domain::services::PageRenderer;
use crate::infrastructure::config::ScraperConfig;
use crate::infrastructure::parsing::SiteAdapter;

/// Persisted result for one record
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub url: String,
    pub outcome: UpsertOutcome,
}

/// Outcome of one site within a run
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub site: SiteId,
    pub source_website: String,
    pub search_url: String,
    /// Records as observed in this run, deep-dived ones enriched
    pub records: Vec<ProductRecord>,
    pub stored: Vec<StoredRecord>,
    pub deep_dived: usize,
    /// Render or parse failure that emptied the search
    pub search_error: Option<String>,
    pub store_errors: Vec<String>,
}

impl SiteReport {
    fn new(site: SiteId, source_website: &str, search_url: String) -> Self {
        Self {
            site,
            source_website: source_website.to_string(),
            search_url,
            records: Vec::new(),
            stored: Vec::new(),
            deep_dived: 0,
            search_error: None,
            store_errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub sites: Vec<SiteReport>,
}

impl ScrapeReport {
    pub fn has_store_errors(&self) -> bool {
        self.sites.iter().any(|site| !site.store_errors.is_empty())
    }

    pub fn total_records(&self) -> usize {
        self.sites.iter().map(|site| site.records.len()).sum()
    }

    pub fn store_errors(&self) -> impl Iterator<Item = &str> {
        self.sites
            .iter()
            .flat_map(|site| site.store_errors.iter().map(String::as_str))
    }
}

pub struct ScrapeService {
    renderer: Arc<dyn PageRenderer>,
    store: Arc<dyn ProductStore>,
    adapters: Vec<SiteAdapter>,
    deep_dive_count: usize,
}

impl ScrapeService {
    pub fn new(renderer: Arc<dyn PageRenderer>, store: Arc<dyn ProductStore>, config: &ScraperConfig) -> Result<Self> {
        config.validate()?;

        let adapters = config
            .sites
            .iter()
            .map(|profile| {
                SiteAdapter::new(profile.clone(), config)
                    .with_context(|| format!("Failed to build adapter for {}", profile.label))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            renderer,
            store,
            adapters,
            deep_dive_count: config.deep_dive_count,
        })
    }

    pub fn sites(&self) -> Vec<SiteId> {
        self.adapters.iter().map(SiteAdapter::site).collect()
    }

    pub fn adapter(&self, site: SiteId) -> Option<&SiteAdapter> {
        self.adapters.iter().find(|adapter| adapter.site() == site)
    }

    fn require_adapter(&self, site: SiteId) -> Result<&SiteAdapter> {
        self.adapter(site)
            .with_context(|| format!("Site {} is not enabled", site))
    }

    async fn try_search(&self, adapter: &SiteAdapter, query: &str, cancel: &CancellationToken) -> Result<Vec<ProductRecord>> {
        let search_url = adapter.search_url(query);
        let markup = self
            .renderer
            .render(&search_url, cancel)
            .await
            .with_context(|| format!("Failed to render search page for '{}' on {}", query, adapter.label()))?;

        let records = adapter
            .extract_listings(&markup, query)
            .with_context(|| format!("Failed to extract listings for '{}' on {}", query, adapter.label()))?;

        info!("Found {} relevant listings for '{}' on {}", records.len(), query, adapter.label());
        Ok(records)
    }

    /// Relevant, priced listings for `query`; empty when the page could not
    /// be rendered or parsed
    pub async fn search(&self, site: SiteId, query: &str, cancel: &CancellationToken) -> Vec<ProductRecord> {
        let adapter = match self.require_adapter(site) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!("{:#}", e);
                return Vec::new();
            }
        };

        self.try_search(adapter, query, cancel).await.unwrap_or_else(|e| {
            warn!("{:#}", e);
            Vec::new()
        })
    }

    async fn try_fetch_specifications(
        &self,
        adapter: &SiteAdapter,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Specifications> {
        let markup = self
            .renderer
            .render(url, cancel)
            .await
            .with_context(|| format!("Failed to render product page {}", url))?;

        let specs = adapter
            .extract_specs(&markup, url)
            .with_context(|| format!("Failed to extract specifications from {}", url))?;

        info!("Extracted {} specifications from {}", specs.len(), url);
        Ok(specs)
    }

    /// Detail-page specifications for `url`; empty when none are found or
    /// the page could not be rendered
    pub async fn fetch_specifications(&self, site: SiteId, url: &str, cancel: &CancellationToken) -> Specifications {
        let adapter = match self.require_adapter(site) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!("{:#}", e);
                return Specifications::new();
            }
        };

        self.try_fetch_specifications(adapter, url, cancel)
            .await
            .unwrap_or_else(|e| {
                warn!("{:#}", e);
                Specifications::new()
            })
    }

    /// Fold detail-page specifications into a listing record; incoming values win
    pub fn enrich(mut record: ProductRecord, specifications: Specifications) -> ProductRecord {
        record.absorb_specifications(specifications);
        record
    }

    async fn scrape_site(&self, adapter: &SiteAdapter, query: &str, cancel: &CancellationToken) -> SiteReport {
        let mut report = SiteReport::new(adapter.site(), adapter.label(), adapter.search_url(query));

        let mut records = match self.try_search(adapter, query, cancel).await {
            Ok(records) => records,
            Err(e) => {
                warn!("{:#}", e);
                report.search_error = Some(format!("{:#}", e));
                return report;
            }
        };

        for record in records.iter_mut().take(self.deep_dive_count) {
            if cancel.is_cancelled() {
                break;
            }
            let specs = self.fetch_specifications(adapter.site(), &record.url, cancel).await;
            record.absorb_specifications(specs);
            report.deep_dived += 1;
        }

        for record in &records {
            match self.store.upsert(record).await {
                Ok(outcome) => report.stored.push(StoredRecord {
                    url: record.url.clone(),
                    outcome,
                }),
                Err(e) => {
                    error!("Failed to store {} from {}: {}", record.url, adapter.label(), e);
                    report.store_errors.push(format!("{}: {}", record.url, e));
                }
            }
        }

        report.records = records;
        report
    }

    /// Search every enabled site, deepen the leading results and persist
    /// everything observed
    pub async fn run(&self, query: &str, cancel: &CancellationToken) -> ScrapeReport {
        let started_at = Utc::now();
        info!("Scraping '{}' on {} sites", query, self.adapters.len());

        let sites = join_all(
            self.adapters
                .iter()
                .map(|adapter| self.scrape_site(adapter, query, cancel)),
        )
        .await;

        let report = ScrapeReport {
            query: query.to_string(),
            started_at,
            finished_at: Utc::now(),
            cancelled: cancel.is_cancelled(),
            sites,
        };

        info!(
            "Scrape of '{}' finished: {} records, store errors: {}",
            query,
            report.total_records(),
            report.has_store_errors()
        );
        report
    }
}
