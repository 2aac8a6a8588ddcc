//! Torrent handling workflow.
//!
//! Classifies each completed torrent and applies the resulting decision
//! through the qBittorrent API: content move, folder/file renames, sentinel
//! placement, and todo-tag removal.

use anyhow::{bail, Context, Result};
use shared::classify::{Classification, ClassificationDecision, Classifier};
use shared::config::Config;
use shared::models::{TagRole, Torrent};
use shared::qbit::QbClient;
use shared::release::ReleaseKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Empty marker file that hides a directory from the downstream media scanner
const SENTINEL_FILE: &str = ".ignore";

/// Result of handling one torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Handled,
    /// Todo tag already removed; nothing to do
    Skipped,
}

/// Counters for a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub handled: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Organizer worker tying the classifier to the qBittorrent client.
pub struct Organizer {
    client: QbClient,
    classifier: Classifier,
    /// Completion-state filter for torrent listings
    status_filter: String,
    /// Category the organizer is responsible for
    category: String,
    /// Whether this process can write sentinel files directly
    local_mode: bool,
    /// Log every action without calling mutating endpoints
    dry_run: bool,
}

impl Organizer {
    pub fn new(client: QbClient, config: &Config, dry_run: bool) -> Self {
        Self {
            client,
            classifier: Classifier::new(config.tag_map(), config.library_root()),
            status_filter: config.filter.status.clone(),
            category: config.filter.category.clone(),
            local_mode: config.library.local_mode,
            dry_run,
        }
    }

    /// Handle a single torrent snapshot.
    pub async fn handle(&self, torrent: &Torrent, force: bool) -> Result<HandleOutcome> {
        if torrent.progress < 1.0 {
            bail!(
                "torrent {} is not complete (progress {:.2})",
                torrent.hash,
                torrent.progress
            );
        }

        info!(hash = %torrent.hash, name = %torrent.name, "Handling torrent");

        let mut decision = match self.classifier.classify(torrent, force)? {
            Classification::AlreadyHandled => {
                info!(hash = %torrent.hash, "Already handled, skipping");
                return Ok(HandleOutcome::Skipped);
            }
            Classification::Decision(decision) => decision,
        };

        // Batch folders get their episode files normalized as well
        if decision.release.kind == ReleaseKind::Batch {
            let files = self
                .client
                .torrent_files(&torrent.hash)
                .await
                .context("Failed to list torrent files")?;
            let norm = self.classifier.normalize_files(&files, self.local_mode);
            decision.file_renames = norm.renames;
            decision.sentinel_dirs = norm.sentinel_dirs;
        }

        self.apply(torrent, &decision).await?;
        Ok(HandleOutcome::Handled)
    }

    /// Look up one torrent by hash and handle it.
    ///
    /// A hash that matches nothing under the configured filter is its own
    /// failure mode, distinct from classification errors.
    pub async fn handle_by_hash(&self, hash: &str, force: bool) -> Result<HandleOutcome> {
        let torrents = self
            .client
            .torrents_info(&self.status_filter, &self.category, Some(hash))
            .await?;
        let [torrent] = torrents.as_slice() else {
            bail!("failed to find torrent {hash} among completed torrents");
        };
        self.handle(torrent, force).await
    }

    /// Handle every completed torrent in the configured category.
    ///
    /// Failures are isolated per torrent: each one is logged and counted,
    /// and the run continues.
    pub async fn handle_all(&self, force: bool) -> Result<RunSummary> {
        let torrents = self
            .client
            .torrents_info(&self.status_filter, &self.category, None)
            .await
            .context("Failed to list completed torrents")?;

        info!(count = torrents.len(), "Listed completed torrents");

        let mut summary = RunSummary::default();
        for torrent in &torrents {
            match self.handle(torrent, force).await {
                Ok(HandleOutcome::Handled) => summary.handled += 1,
                Ok(HandleOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    error!(hash = %torrent.hash, name = %torrent.name, error = %e, "Failed to handle torrent");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Ensure every RSS auto-download rule tags new torrents with the todo
    /// marker. Returns the number of rules updated.
    pub async fn tag_feed_rules(&self) -> Result<usize> {
        let todo = self.classifier.tag_map().literal(TagRole::Todo).to_string();
        let rules = self.client.rss_rules().await.context("Failed to list RSS rules")?;

        let mut updated = 0;
        for (name, mut rule) in rules {
            if rule.torrent_params.tags.iter().any(|t| *t == todo) {
                continue;
            }
            info!(rule = %name, tag = %todo, "Adding todo tag to rule");
            rule.torrent_params.tags.push(todo.clone());
            if !self.dry_run {
                self.client
                    .rss_set_rule(&name, &rule)
                    .await
                    .with_context(|| format!("Failed to update rule {name}"))?;
            }
            updated += 1;
        }

        Ok(updated)
    }

    /// Apply a classification decision through the API.
    async fn apply(&self, torrent: &Torrent, decision: &ClassificationDecision) -> Result<()> {
        let release = &decision.release;
        match release.kind {
            ReleaseKind::Single => info!(
                title = %release.title,
                season = release.season,
                episode = release.episode.unwrap_or(0),
                target = %decision.target_path.display(),
                "Matched single episode"
            ),
            ReleaseKind::Batch => info!(
                title = %release.title,
                season = release.season,
                target = %decision.target_path.display(),
                "Matched batch release"
            ),
        }

        // File renames go first, while paths still carry the original folder
        // name; then the folder rename; then the move.
        for (old, new) in &decision.file_renames {
            if self.dry_run {
                info!(old = %old, new = %new, "Would rename file");
            } else {
                self.client
                    .rename_file(&torrent.hash, old, new)
                    .await
                    .with_context(|| format!("Failed to rename file {old}"))?;
                info!(old = %old, new = %new, "Renamed file");
            }
        }

        if let Some((old, new)) = &decision.folder_rename {
            if self.dry_run {
                info!(old = %old, new = %new, "Would rename folder");
            } else {
                self.client
                    .rename_folder(&torrent.hash, old, new)
                    .await
                    .with_context(|| format!("Failed to rename folder {old}"))?;
                info!(old = %old, new = %new, "Renamed folder");
            }
        }

        let target = decision.target_path.to_string_lossy();
        if self.dry_run {
            info!(target = %target, "Would move torrent");
        } else {
            self.client
                .set_location(&torrent.hash, &target)
                .await
                .with_context(|| format!("Failed to move torrent to {target}"))?;
            info!(target = %target, "Moved torrent");
        }

        self.place_sentinels(decision)?;

        let tags: Vec<&str> = decision
            .tags_to_remove
            .iter()
            .map(|role| self.classifier.tag_map().literal(*role))
            .collect();
        if self.dry_run {
            info!(?tags, "Would remove tags");
        } else {
            self.client
                .remove_tags(&torrent.hash, &tags)
                .await
                .context("Failed to remove tags")?;
            info!(?tags, "Removed tags");
        }

        Ok(())
    }

    /// Write empty sentinel files for nested extras folders.
    ///
    /// Sentinel directories are recorded relative to the torrent's original
    /// folder name; by the time they are written, the folder has been renamed
    /// and moved, so the first path segment is swapped for the renamed folder
    /// under the target directory.
    fn place_sentinels(&self, decision: &ClassificationDecision) -> Result<()> {
        if decision.sentinel_dirs.is_empty() {
            return Ok(());
        }
        let Some((_, folder)) = &decision.folder_rename else {
            warn!("Sentinel dirs recorded without a folder rename, skipping");
            return Ok(());
        };

        for dir in &decision.sentinel_dirs {
            let final_dir = sentinel_dir(&decision.target_path, folder, dir);
            let marker = final_dir.join(SENTINEL_FILE);
            if self.dry_run {
                info!(path = %marker.display(), "Would place scanner sentinel");
                continue;
            }
            std::fs::create_dir_all(&final_dir)
                .with_context(|| format!("Failed to create {}", final_dir.display()))?;
            std::fs::write(&marker, b"")
                .with_context(|| format!("Failed to write {}", marker.display()))?;
            info!(path = %marker.display(), "Placed scanner sentinel");
        }

        Ok(())
    }
}

/// Final on-disk directory for a sentinel request: the original top folder
/// segment is swapped for the renamed folder under the target directory.
fn sentinel_dir(target: &Path, renamed_folder: &str, dir: &Path) -> PathBuf {
    let sub: PathBuf = dir.components().skip(1).collect();
    target.join(renamed_folder).join(sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_dir_swaps_top_folder() {
        let dir = sentinel_dir(
            Path::new("/jellyfin/anime/Show Name"),
            "S02",
            Path::new("[Group] Show Name S02 [Batch]/extras"),
        );
        assert_eq!(dir, PathBuf::from("/jellyfin/anime/Show Name/S02/extras"));
    }
}
