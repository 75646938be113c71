//! Configuration infrastructure
//!
//! Contains configuration loading and management for price scouting.
//!
//! Configuration is organized into four sections:
//! 1. Scraper settings (result cap, currency, relevance tables, site profiles)
//! 2. Renderer settings (HTTP identity and timeouts)
//! 3. Database location
//! 4. Logging
//!
//! Every field has a default, so partial config files load cleanly.

#![allow(clippy::uninlined_format_args)]
#![allow(missing_docs)]

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

use crate::domain::product::SiteId;
use crate::infrastructure::parsing::config::SiteProfile;
use crate::infrastructure::parsing::price::CurrencyMarker;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub renderer: RendererConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Extraction settings shared by every site adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Maximum records returned by one search on one site
    pub max_results: usize,

    /// Currency assumed when a price carries no recognizable marker
    pub default_currency: String,

    /// Leading search results per site that get a detail-page visit
    pub deep_dive_count: usize,

    /// Accessory/peripheral terms that reject a listing title
    pub negative_keywords: Vec<String>,

    /// Query token -> renderings of that token in other scripts
    pub brand_transliterations: BTreeMap<String, Vec<String>>,

    /// Markers recognized when scanning free text for a price
    pub currency_markers: Vec<CurrencyMarker>,

    /// Enabled storefronts, searched in this order
    pub sites: Vec<SiteProfile>,
}

/// Settings for fetching rendered markup over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_seconds: u64,
    pub follow_redirects: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLx connection URL; defaults to a file in the app data directory
    pub url: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log file name inside the log directory
    pub file_name: String,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_results: defaults::MAX_RESULTS,
            default_currency: defaults::DEFAULT_CURRENCY.to_string(),
            deep_dive_count: defaults::DEEP_DIVE_COUNT,
            negative_keywords: defaults::negative_keywords(),
            brand_transliterations: defaults::brand_transliterations(),
            currency_markers: defaults::currency_markers(),
            sites: SiteId::ALL.into_iter().map(SiteProfile::for_site).collect(),
        }
    }
}

impl ScraperConfig {
    pub fn profile(&self, site: SiteId) -> Option<&SiteProfile> {
        self.sites.iter().find(|profile| profile.site == site)
    }

    /// Keep only the given sites, in the given order
    pub fn restrict_to(&mut self, sites: &[SiteId]) {
        let mut restricted = Vec::with_capacity(sites.len());
        for site in sites {
            if restricted.iter().any(|p: &SiteProfile| p.site == *site) {
                continue;
            }
            if let Some(profile) = self.profile(*site) {
                restricted.push(profile.clone());
            } else {
                restricted.push(SiteProfile::for_site(*site));
            }
        }
        self.sites = restricted;
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_currency.trim().is_empty() {
            bail!("scraper.default_currency must not be empty");
        }
        if self.currency_markers.iter().all(|m| m.marker.trim().is_empty()) {
            bail!("scraper.currency_markers must contain at least one marker");
        }
        if self.deep_dive_count > self.max_results {
            warn!(
                "deep_dive_count ({}) exceeds max_results ({}); at most {} records per site will be deepened",
                self.deep_dive_count, self.max_results, self.max_results
            );
        }
        for profile in &self.sites {
            profile
                .validate()
                .with_context(|| format!("Invalid site profile for {}", profile.site))?;
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            follow_redirects: true,
        }
    }
}

impl DatabaseConfig {
    /// Configured URL, or the default database file under the app data directory
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }
        let path = ConfigManager::get_app_data_dir()?
            .join("database")
            .join(defaults::DATABASE_FILE_NAME);
        Ok(format!("sqlite:{}", path.display()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters.insert("price_scout".to_string(), "info".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Manager for the default config file location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    /// Manager for an explicit config file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist.
    ///
    /// A file that fails to parse is copied aside as `*.json.corrupted` and
    /// replaced with the defaults.
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("Configuration file could not be parsed: {}", parse_error);
                warn!("Resetting to default configuration");

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    use std::collections::BTreeMap;

    use crate::domain::product;
    use crate::infrastructure::parsing::price::CurrencyMarker;

    /// Directory name under the user config/data directories
    pub const APP_DIR_NAME: &str = "price-scout";

    pub const CONFIG_FILE_NAME: &str = "config.json";

    pub const DATABASE_FILE_NAME: &str = "price_scout.db";

    /// Default maximum records per site search
    pub const MAX_RESULTS: usize = product::DEFAULT_MAX_RESULTS;

    pub const DEFAULT_CURRENCY: &str = product::DEFAULT_CURRENCY;

    /// Default number of top results enriched with detail-page specifications
    pub const DEEP_DIVE_COUNT: usize = 1;

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,ar;q=0.8";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;

    pub const LOG_FILE_NAME: &str = "price-scout.log";

    /// Accessory and peripheral terms, English and Arabic
    pub const NEGATIVE_KEYWORDS: &[&str] = &[
        "case", "cover", "protector", "screen", "glass", "monitor", "شاشة", "جراب", "سكرينة", "كفر", "وصلة",
        "mouse", "ماوس", "bag", "شنطة",
    ];

    /// Brand name -> Arabic rendering
    pub const BRAND_TRANSLITERATIONS: &[(&str, &str)] =
        &[("lenovo", "لينوفو"), ("samsung", "سامسونج"), ("iphone", "ايفون"), ("apple", "ابل")];

    /// Marker text -> currency code
    pub const CURRENCY_MARKERS: &[(&str, &str)] = &[("EGP", "EGP"), ("LE", "EGP"), ("جنيه", "EGP"), ("ج.م", "EGP")];

    pub fn negative_keywords() -> Vec<String> {
        NEGATIVE_KEYWORDS.iter().map(|k| (*k).to_string()).collect()
    }

    pub fn brand_transliterations() -> BTreeMap<String, Vec<String>> {
        BRAND_TRANSLITERATIONS
            .iter()
            .map(|(brand, rendering)| ((*brand).to_string(), vec![(*rendering).to_string()]))
            .collect()
    }

    pub fn currency_markers() -> Vec<CurrencyMarker> {
        CURRENCY_MARKERS
            .iter()
            .map(|(marker, currency)| CurrencyMarker::new(*marker, *currency))
            .collect()
    }
}
