//! Command-line interface for albumcast.
//!
//! Provides commands for one-shot full synchronization, the long-running
//! watch mode, and inspecting the catalog and resolved configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::adapters::TagExtractor;
use crate::config::{self, ResolvedConfig};
use crate::ingest::Watcher;
use crate::library::Catalog;
use crate::sync::SyncEngine;

/// albumcast - publishes per-album podcast feeds from a watched music directory
#[derive(Parser, Debug)]
#[command(name = "albumcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the whole media directory and regenerate every document
    Bootstrap,

    /// Bootstrap, then watch the media directory until interrupted
    Run,

    /// List cataloged items
    Catalog {
        /// Maximum number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Arc::new(config::load_config()?);

        match self.command {
            Commands::Bootstrap => bootstrap(config).await,
            Commands::Run => run(config).await,
            Commands::Catalog { limit } => show_catalog(&config, limit).await,
            Commands::Config => show_config(&config),
        }
    }
}

async fn build_engine(config: Arc<ResolvedConfig>) -> Result<Arc<SyncEngine>> {
    config.validate()?;

    let extractor = Arc::new(TagExtractor::new(&config));
    let engine = SyncEngine::new(config, extractor)
        .await
        .context("Failed to initialize synchronization engine")?;

    Ok(Arc::new(engine))
}

async fn bootstrap(config: Arc<ResolvedConfig>) -> Result<()> {
    let engine = build_engine(config).await?;
    let admitted = engine.bootstrap().await?;

    println!("Admitted {} items", admitted);
    Ok(())
}

async fn run(config: Arc<ResolvedConfig>) -> Result<()> {
    let engine = build_engine(config.clone()).await?;
    engine.bootstrap().await?;

    let handle = Watcher::new(config).spawn(engine)?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    handle
        .stop()
        .await
        .context("Watch loop did not shut down cleanly")?;

    Ok(())
}

async fn show_catalog(config: &ResolvedConfig, limit: usize) -> Result<()> {
    let catalog = Catalog::load(&config.catalog_path()).await?;

    if catalog.is_empty() {
        println!("Catalog is empty");
        return Ok(());
    }

    println!("{} items in {} albums\n", catalog.len(), catalog.albums.len());
    for album in catalog.album_names() {
        let items = catalog.album_items(album);
        if items.is_empty() {
            println!("{} (empty, stale feed)", album);
            continue;
        }

        println!("{}", album);
        for item in items.into_iter().take(limit) {
            println!(
                "  {}  {}  ({})",
                item.duration_hhmmss(),
                item.title,
                item.path.display()
            );
        }
    }

    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("home:           {}", config.home.display());
    println!("site dir:       {}", config.site_dir.display());
    println!("media dir:      {}", config.media_dir.display());
    println!("catalog:        {}", config.catalog_path().display());
    println!("feeds dir:      {}", config.feeds_dir().display());
    println!("index:          {}", config.index_path().display());
    println!("poll interval:  {}s", config.poll_interval_secs);
    println!("event source:   {}", config.use_event_source);
    println!(
        "quiescence:     {}ms x {}",
        config.quiescence.interval_ms, config.quiescence.max_attempts
    );
    match &config.config_file {
        Some(path) => println!("config file:    {}", path.display()),
        None => println!("config file:    (none)"),
    }

    Ok(())
}
