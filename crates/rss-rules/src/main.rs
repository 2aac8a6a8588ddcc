//! RSS rule manager.
//!
//! Interactively creates qBittorrent auto-download rules for ongoing shows,
//! pre-tagged so the organizer picks the resulting torrents up later.

use anyhow::{bail, Context, Result};
use clap::Parser;
use shared::config::Config;
use shared::models::{RssRule, TagRole, TorrentParams};
use shared::qbit::QbClient;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rss-rules")]
#[command(about = "Create and inspect qBittorrent RSS auto-download rules")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Show existing rules instead of creating one
    #[arg(long)]
    show: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    shared::logging::init_for_component("rss-rules", &config.logging, false)?;

    let client = QbClient::connect(
        &config.qbittorrent.host,
        &config.qbittorrent.username,
        &config.qbittorrent.password,
    )
    .await
    .context("Failed to connect to qBittorrent")?;

    if args.show {
        show_rules(&client).await
    } else {
        add_rule(&client, &config).await
    }
}

/// Print all configured auto-download rules.
async fn show_rules(client: &QbClient) -> Result<()> {
    let rules = client.rss_rules().await.context("Failed to list RSS rules")?;

    if rules.is_empty() {
        println!("No RSS rules configured.");
        return Ok(());
    }

    println!("RSS rules:");
    for (name, rule) in &rules {
        println!("{}: {}", name, serde_json::to_string_pretty(rule)?);
    }

    Ok(())
}

/// Interactively create a rule for an ongoing show.
async fn add_rule(client: &QbClient, config: &Config) -> Result<()> {
    println!("Creating new RSS rule for an ongoing show...");

    let name = prompt("Rule name: ")?;
    if name.is_empty() {
        bail!("rule name must not be empty");
    }

    let feeds: Vec<_> = client
        .rss_items()
        .await
        .context("Failed to list RSS feeds")?
        .into_iter()
        .collect();
    if feeds.is_empty() {
        bail!("no RSS feeds configured in qBittorrent");
    }

    for (i, (feed_name, _)) in feeds.iter().enumerate() {
        println!("{} {}", i, feed_name);
    }
    let source_index: usize = prompt("Source: ")?
        .parse()
        .context("feed selection must be a number")?;
    let Some((_, feed)) = feeds.get(source_index) else {
        bail!("feed index {source_index} out of range");
    };

    let keyword = prompt("Keyword (regex): ")?;
    let bt = matches!(
        prompt("BT (y/N): ")?.to_lowercase().as_str(),
        "y" | "yes"
    );

    let tag_map = config.tag_map();
    let mut tags = vec![
        tag_map.literal(TagRole::Ongoing).to_string(),
        tag_map.literal(TagRole::Todo).to_string(),
    ];
    if bt {
        tags.push(config.tags.bt.clone());
    }

    let rule = RssRule {
        enabled: true,
        must_contain: keyword,
        // Batch re-releases carry the completed keyword and are handled by
        // hand, not by ongoing-show rules
        must_not_contain: config.rss.completed_keyword.clone(),
        use_regex: true,
        affected_feeds: vec![feed.url.clone()],
        assigned_category: config.filter.category.clone(),
        torrent_params: TorrentParams {
            category: config.filter.category.clone(),
            tags,
            ..Default::default()
        },
        ..Default::default()
    };

    client
        .rss_set_rule(&name, &rule)
        .await
        .with_context(|| format!("Failed to create rule {name}"))?;

    info!(rule = %name, "RSS rule created");
    println!("Rule '{name}' created.");

    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}
