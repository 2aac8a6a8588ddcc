//! qBittorrent Web API client.
//!
//! Thin async wrapper over the v2 Web API endpoints the organizer needs:
//! torrent listing/moving/renaming, tag removal, and RSS rule management.
//! Transport failures surface as contextual errors; retrying is left to the
//! operator.

use crate::models::{RssFeed, RssRule, Torrent, TorrentFile};
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// qBittorrent Web API v2 client with a cookie-based session
pub struct QbClient {
    /// HTTP client (holds the session cookie)
    client: Client,
    /// Web UI base URL without trailing slash
    base_url: String,
}

impl QbClient {
    /// Connect and authenticate against the Web UI.
    pub async fn connect(host: &str, username: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("bangumi-organizer/0.1.0")
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        let qb = Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
        };
        qb.login(username, password).await?;
        Ok(qb)
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let url = format!("{}/api/v2/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .with_context(|| format!("Failed to reach qBittorrent at {}", self.base_url))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        // The endpoint answers 200 with a literal "Fails." on bad credentials
        if !status.is_success() || body.trim() != "Ok." {
            return Err(anyhow!(
                "qBittorrent login rejected (status {}, body {:?})",
                status,
                body.trim()
            ));
        }

        info!(host = %self.base_url, "Authenticated against qBittorrent");
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/api/v2/{}", self.base_url, endpoint);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("GET {url} failed with status {status}: {body}"));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }

    async fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<()> {
        let url = format!("{}/api/v2/{}", self.base_url, endpoint);
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Request failed: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("POST {url} failed with status {status}: {body}"));
        }

        Ok(())
    }

    /// List torrents matching the given completion filter and category,
    /// optionally narrowed to one hash.
    pub async fn torrents_info(
        &self,
        status_filter: &str,
        category: &str,
        hashes: Option<&str>,
    ) -> Result<Vec<Torrent>> {
        let mut query = vec![("filter", status_filter), ("category", category)];
        if let Some(hashes) = hashes {
            query.push(("hashes", hashes));
        }
        self.get_json("torrents/info", &query).await
    }

    /// List the files inside a torrent.
    pub async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFile>> {
        self.get_json("torrents/files", &[("hash", hash)]).await
    }

    /// Move a torrent's content to a new directory.
    pub async fn set_location(&self, hash: &str, location: &str) -> Result<()> {
        self.post_form("torrents/setLocation", &[("hashes", hash), ("location", location)])
            .await
    }

    /// Rename the torrent's top-level folder.
    pub async fn rename_folder(&self, hash: &str, old_path: &str, new_path: &str) -> Result<()> {
        self.post_form(
            "torrents/renameFolder",
            &[("hash", hash), ("oldPath", old_path), ("newPath", new_path)],
        )
        .await
    }

    /// Rename a single file inside the torrent.
    pub async fn rename_file(&self, hash: &str, old_path: &str, new_path: &str) -> Result<()> {
        self.post_form(
            "torrents/renameFile",
            &[("hash", hash), ("oldPath", old_path), ("newPath", new_path)],
        )
        .await
    }

    /// Remove tags from a torrent.
    pub async fn remove_tags(&self, hash: &str, tags: &[&str]) -> Result<()> {
        self.post_form(
            "torrents/removeTags",
            &[("hashes", hash), ("tags", &tags.join(","))],
        )
        .await
    }

    /// Fetch all RSS auto-download rules, keyed by rule name.
    pub async fn rss_rules(&self) -> Result<BTreeMap<String, RssRule>> {
        self.get_json("rss/rules", &[]).await
    }

    /// Fetch all RSS feeds, keyed by feed name.
    pub async fn rss_items(&self) -> Result<BTreeMap<String, RssFeed>> {
        self.get_json("rss/items", &[("withData", "false")]).await
    }

    /// Create or replace an RSS auto-download rule.
    pub async fn rss_set_rule(&self, name: &str, rule: &RssRule) -> Result<()> {
        let rule_def =
            serde_json::to_string(rule).context("Failed to serialize RSS rule definition")?;
        self.post_form("rss/setRule", &[("ruleName", name), ("ruleDef", &rule_def)])
            .await
    }
}
