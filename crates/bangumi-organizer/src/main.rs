//! Bangumi organizer.
//!
//! Sorts completed qBittorrent downloads into the media-library layout,
//! driven by release-name parsing and lifecycle tags.

use anyhow::{Context, Result};
use clap::Parser;
use shared::config::Config;
use shared::qbit::QbClient;
use std::path::PathBuf;
use tracing::info;

mod organizer;

use organizer::{HandleOutcome, Organizer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Handle a single torrent by hash instead of all completed torrents
    #[arg(long)]
    hash: Option<String>,

    /// Handle torrents even when the todo tag is absent
    #[arg(short, long)]
    force: bool,

    /// Ensure every RSS rule tags new torrents with the todo tag, then exit
    #[arg(long)]
    set_rss_tag: bool,

    /// Log every action without calling any mutating endpoint
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    shared::logging::init_for_component("bangumi-organizer", &config.logging, args.verbose)?;

    info!("Bangumi organizer starting");
    info!(config_file = %args.config.display(), "Loaded configuration");
    info!(
        library = %config.library.root,
        category = %config.filter.category,
        local_mode = config.library.local_mode,
        dry_run = args.dry_run,
        "Runtime configuration"
    );

    // Connect to qBittorrent
    let client = QbClient::connect(
        &config.qbittorrent.host,
        &config.qbittorrent.username,
        &config.qbittorrent.password,
    )
    .await
    .context("Failed to connect to qBittorrent")?;

    let organizer = Organizer::new(client, &config, args.dry_run);

    if args.set_rss_tag {
        let updated = organizer.tag_feed_rules().await?;
        info!(updated, "RSS rules now carry the todo tag");
        return Ok(());
    }

    match &args.hash {
        Some(hash) => {
            match organizer.handle_by_hash(hash, args.force).await? {
                HandleOutcome::Handled => info!(hash = %hash, "Torrent handled"),
                HandleOutcome::Skipped => info!(hash = %hash, "Torrent skipped"),
            }
        }
        None => {
            let summary = organizer.handle_all(args.force).await?;
            info!("=== Run Complete ===");
            info!("Handled: {}", summary.handled);
            info!("Skipped: {}", summary.skipped);
            info!("Failed: {}", summary.failed);
        }
    }

    Ok(())
}
