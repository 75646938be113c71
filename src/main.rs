//! Price Scout CLI
//!
//! `price-scout search <query>` scrapes every enabled site and prints the
//! run report as JSON on stdout; `price-scout list` prints stored records.

#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use price_scout::infrastructure::logging::{init_logging_with_config, log_system_info};
use price_scout::infrastructure::{AppConfig, ConfigManager, DatabaseConnection, HttpClient, SqliteProductStore};
use price_scout::{ProductStore, ScrapeService, SiteId};

#[derive(Debug, Parser)]
#[command(name = "price-scout", version, about = "Storefront price and specification scout", long_about = None)]
struct Cli {
    /// Configuration file; defaults to the user config directory
    #[arg(long, global = true, env = "PRICE_SCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// SQLx database URL, overriding the configuration
    #[arg(long, global = true, env = "PRICE_SCOUT_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level, overriding the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search storefronts, enrich the top results and store everything found
    Search(SearchArgs),
    /// Print stored products, most recently scraped first
    List(ListArgs),
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Free-text product query
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Restrict to these sites (amazon, btech); repeatable
    #[arg(long = "site")]
    sites: Vec<SiteId>,

    /// Maximum records per site
    #[arg(long)]
    max_results: Option<usize>,

    /// Leading results per site that get a detail-page visit
    #[arg(long)]
    deep_dive: Option<usize>,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long, default_value_t = 20)]
    limit: u32,
}

async fn load_config(cli: &Cli) -> Result<AppConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = manager.load_config().await?;

    if let Some(url) = &cli.database_url {
        config.database.url = Some(url.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Commands::Search(args) = &cli.command {
        if !args.sites.is_empty() {
            config.scraper.restrict_to(&args.sites);
        }
        if let Some(max_results) = args.max_results {
            config.scraper.max_results = max_results;
        }
        if let Some(deep_dive) = args.deep_dive {
            config.scraper.deep_dive_count = deep_dive;
        }
    }

    Ok(config)
}

async fn open_store(config: &AppConfig) -> Result<Arc<SqliteProductStore>> {
    let database_url = config.database.database_url()?;
    let db = DatabaseConnection::new(&database_url).await?;
    let store = SqliteProductStore::new(Arc::new(db.into_pool()));
    store.init().await.context("Failed to initialize product store")?;
    info!("Using database {}", database_url);
    Ok(Arc::new(store))
}

/// Token cancelled on Ctrl-C
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling in-flight requests");
            child.cancel();
        }
    });
    token
}

async fn search(config: &AppConfig, args: &SearchArgs) -> Result<()> {
    let query = args.query.join(" ");
    if query.trim().is_empty() {
        bail!("Query must not be empty");
    }

    let store = open_store(config).await?;
    let renderer = Arc::new(HttpClient::new(config.renderer.clone())?);
    let service = ScrapeService::new(renderer, store, &config.scraper)?;

    let cancel = shutdown_token();
    let report = service.run(query.trim(), &cancel).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.has_store_errors() {
        for failure in report.store_errors() {
            error!("Store failure: {}", failure);
        }
        bail!("Some observations could not be stored");
    }
    if report.cancelled {
        bail!("Scrape cancelled");
    }
    Ok(())
}

async fn list(config: &AppConfig, args: &ListArgs) -> Result<()> {
    let store = open_store(config).await?;
    let products = store.list_products(args.limit).await?;
    println!("{}", serde_json::to_string_pretty(&products)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;
    init_logging_with_config(&config.logging)?;
    log_system_info();
    config.scraper.validate()?;

    match &cli.command {
        Commands::Search(args) => search(&config, args).await,
        Commands::List(args) => list(&config, args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
