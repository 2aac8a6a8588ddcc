//! Configuration management for the organizer tools.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with defaults matching a stock qBittorrent setup.

use crate::models::TagMap;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// qBittorrent Web API connection
    #[serde(default)]
    pub qbittorrent: QbConfig,

    /// Torrent listing filter
    #[serde(default)]
    pub filter: FilterConfig,

    /// Tag literals for each lifecycle role
    #[serde(default)]
    pub tags: TagsConfig,

    /// Media library settings
    #[serde(default)]
    pub library: LibraryConfig,

    /// RSS rule creation settings
    #[serde(default)]
    pub rss: RssConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// qBittorrent connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QbConfig {
    /// Web UI base URL
    pub host: String,
    pub username: String,
    pub password: String,
}

/// Filter applied when listing torrents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Completion-state filter passed to the torrents listing
    pub status: String,
    /// Category the organizer is responsible for
    pub category: String,
}

/// Literal tag strings used in qBittorrent for each role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    /// Torrent awaits processing
    pub todo: String,
    /// Series has finished airing
    pub completed: String,
    /// Series still airing
    pub ongoing: String,
    /// Marker for BT-sourced rules (rss-rules tool only)
    pub bt: String,
}

/// Media library configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library root directory (as seen by qBittorrent)
    pub root: String,
    /// Whether this process has direct filesystem access to the library,
    /// enabling sentinel-file placement for nested extras folders
    pub local_mode: bool,
}

/// RSS rule creation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    /// Keyword excluded from ongoing-show rules (batch re-releases carry it)
    pub completed_keyword: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for QbConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080/".to_string(),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            status: "completed".to_string(),
            category: "动漫".to_string(),
        }
    }
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            todo: "RSS".to_string(),
            completed: "完结".to_string(),
            ongoing: "连载".to_string(),
            bt: "BT".to_string(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: "/jellyfin/anime".to_string(),
            local_mode: false,
        }
    }
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            completed_keyword: "TV".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: false,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qbittorrent: QbConfig::default(),
            filter: FilterConfig::default(),
            tags: TagsConfig::default(),
            library: LibraryConfig::default(),
            rss: RssConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load configuration from a TOML file or fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Build the role-to-literal tag mapping used by the classifier
    pub fn tag_map(&self) -> TagMap {
        TagMap::new(
            self.tags.todo.clone(),
            self.tags.completed.clone(),
            self.tags.ongoing.clone(),
        )
    }

    /// Get the library root path
    pub fn library_root(&self) -> PathBuf {
        PathBuf::from(&self.library.root)
    }

    /// Get the log directory path
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.logging.log_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagRole;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.qbittorrent.host, "http://localhost:8080/");
        assert_eq!(config.filter.status, "completed");
        assert_eq!(config.tags.todo, "RSS");
        assert_eq!(config.library.root, "/jellyfin/anime");
        assert!(!config.library.local_mode);
        assert_eq!(config.rss.completed_keyword, "TV");
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config::default();
        original_config.save(&config_path)?;

        assert!(config_path.exists());

        let loaded_config = Config::from_file(&config_path)?;
        assert_eq!(loaded_config.qbittorrent.host, original_config.qbittorrent.host);
        assert_eq!(loaded_config.tags.completed, original_config.tags.completed);
        assert_eq!(loaded_config.library.root, original_config.library.root);

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        // Should return default config without error
        assert_eq!(config.filter.category, "动漫");
    }

    #[test]
    fn test_partial_config_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[library]\nroot = \"/mnt/anime\"\nlocal_mode = true\n",
        )?;

        let config = Config::from_file(&config_path)?;
        assert_eq!(config.library.root, "/mnt/anime");
        assert!(config.library.local_mode);
        assert_eq!(config.tags.ongoing, "连载");

        Ok(())
    }

    #[test]
    fn test_tag_map_roles() {
        let map = Config::default().tag_map();
        assert_eq!(map.role_of("RSS"), Some(TagRole::Todo));
        assert_eq!(map.literal(TagRole::Ongoing), "连载");
    }
}
