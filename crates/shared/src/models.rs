//! Data models for the organizer tools.
//!
//! This module defines the tag-role types driving classification and the
//! torrent/RSS snapshot structures deserialized from the qBittorrent Web API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Lifecycle role a tag can play for a torrent.
///
/// Configured tag literals (e.g. "RSS", "完结", "连载") are translated to
/// roles once at config-load time so the core logic never compares raw
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagRole {
    /// Torrent awaits classification/processing.
    Todo,
    /// Series has finished airing; batch releases expected.
    Completed,
    /// Series still airing; single-episode releases expected.
    Ongoing,
}

impl std::fmt::Display for TagRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagRole::Todo => write!(f, "todo"),
            TagRole::Completed => write!(f, "completed"),
            TagRole::Ongoing => write!(f, "ongoing"),
        }
    }
}

/// Airing state derived from a torrent's tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Ongoing,
    Completed,
}

/// Tag state of one torrent: whether the todo marker is present, and which
/// lifecycle tag (if any) it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagState {
    pub todo: bool,
    pub lifecycle: Option<Lifecycle>,
}

/// Mapping between tag roles and the literal tag strings used in qBittorrent.
#[derive(Debug, Clone)]
pub struct TagMap {
    todo: String,
    completed: String,
    ongoing: String,
}

impl TagMap {
    pub fn new(todo: impl Into<String>, completed: impl Into<String>, ongoing: impl Into<String>) -> Self {
        Self {
            todo: todo.into(),
            completed: completed.into(),
            ongoing: ongoing.into(),
        }
    }

    /// Get the literal tag string for a role.
    pub fn literal(&self, role: TagRole) -> &str {
        match role {
            TagRole::Todo => &self.todo,
            TagRole::Completed => &self.completed,
            TagRole::Ongoing => &self.ongoing,
        }
    }

    /// Translate a literal tag string to its role, if it has one.
    pub fn role_of(&self, tag: &str) -> Option<TagRole> {
        if tag == self.todo {
            Some(TagRole::Todo)
        } else if tag == self.completed {
            Some(TagRole::Completed)
        } else if tag == self.ongoing {
            Some(TagRole::Ongoing)
        } else {
            None
        }
    }

    /// Derive the tag state from a torrent's tag list.
    ///
    /// The completed tag takes precedence when a torrent somehow carries both
    /// lifecycle tags.
    pub fn state_of<'a>(&self, tags: impl IntoIterator<Item = &'a String>) -> TagState {
        let mut todo = false;
        let mut completed = false;
        let mut ongoing = false;
        for tag in tags {
            match self.role_of(tag) {
                Some(TagRole::Todo) => todo = true,
                Some(TagRole::Completed) => completed = true,
                Some(TagRole::Ongoing) => ongoing = true,
                None => {}
            }
        }
        let lifecycle = if completed {
            Some(Lifecycle::Completed)
        } else if ongoing {
            Some(Lifecycle::Ongoing)
        } else {
            None
        };
        TagState { todo, lifecycle }
    }
}

/// Torrent snapshot as returned by `/api/v2/torrents/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct Torrent {
    pub hash: String,
    pub name: String,
    /// Download progress, 0.0 to 1.0
    pub progress: f64,
    /// Tag list (the API sends a comma-separated string)
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    pub save_path: String,
    #[serde(default)]
    pub category: String,
}

/// One file inside a torrent, as returned by `/api/v2/torrents/files`.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent's save path
    #[serde(rename = "name")]
    pub path: String,
    pub size: i64,
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Torrent parameters attached to an RSS auto-download rule.
///
/// Unknown keys are preserved verbatim so rewriting a rule never drops
/// settings this tool does not model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentParams {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// RSS auto-download rule, `/api/v2/rss/rules` shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RssRule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub must_contain: String,
    #[serde(default)]
    pub must_not_contain: String,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub affected_feeds: Vec<String>,
    #[serde(default)]
    pub assigned_category: String,
    #[serde(default)]
    pub torrent_params: TorrentParams,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// RSS feed entry, `/api/v2/rss/items` shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RssFeed {
    pub url: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_map() -> TagMap {
        TagMap::new("RSS", "完结", "连载")
    }

    #[test]
    fn test_role_translation() {
        let map = tag_map();
        assert_eq!(map.role_of("RSS"), Some(TagRole::Todo));
        assert_eq!(map.role_of("完结"), Some(TagRole::Completed));
        assert_eq!(map.role_of("连载"), Some(TagRole::Ongoing));
        assert_eq!(map.role_of("BT"), None);
        assert_eq!(map.literal(TagRole::Todo), "RSS");
    }

    #[test]
    fn test_state_of() {
        let map = tag_map();

        let tags = vec!["RSS".to_string(), "连载".to_string()];
        let state = map.state_of(&tags);
        assert!(state.todo);
        assert_eq!(state.lifecycle, Some(Lifecycle::Ongoing));

        let tags = vec!["完结".to_string(), "BT".to_string()];
        let state = map.state_of(&tags);
        assert!(!state.todo);
        assert_eq!(state.lifecycle, Some(Lifecycle::Completed));

        let tags = vec!["BT".to_string()];
        let state = map.state_of(&tags);
        assert!(!state.todo);
        assert_eq!(state.lifecycle, None);
    }

    #[test]
    fn test_completed_wins_over_ongoing() {
        let map = tag_map();
        let tags = vec!["连载".to_string(), "完结".to_string()];
        assert_eq!(map.state_of(&tags).lifecycle, Some(Lifecycle::Completed));
    }

    #[test]
    fn test_torrent_tags_deserialization() {
        let json = r#"{
            "hash": "abc123",
            "name": "[Group] Show - 01 [1080p].mkv",
            "progress": 1.0,
            "tags": "RSS, 连载",
            "save_path": "/downloads",
            "category": "动漫"
        }"#;
        let torrent: Torrent = serde_json::from_str(json).unwrap();
        assert_eq!(torrent.tags, vec!["RSS", "连载"]);
        assert_eq!(torrent.progress, 1.0);
    }

    #[test]
    fn test_empty_tags_deserialization() {
        let json = r#"{
            "hash": "abc123",
            "name": "x",
            "progress": 0.5,
            "tags": "",
            "save_path": "/downloads"
        }"#;
        let torrent: Torrent = serde_json::from_str(json).unwrap();
        assert!(torrent.tags.is_empty());
    }

    #[test]
    fn test_rss_rule_preserves_unknown_fields() {
        let json = r#"{
            "enabled": true,
            "mustContain": "Show",
            "mustNotContain": "TV",
            "useRegex": true,
            "affectedFeeds": ["https://example.com/rss"],
            "assignedCategory": "动漫",
            "episodeFilter": "",
            "torrentParams": {
                "category": "动漫",
                "tags": ["连载", "RSS"],
                "save_path": ""
            }
        }"#;
        let rule: RssRule = serde_json::from_str(json).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.torrent_params.tags, vec!["连载", "RSS"]);
        assert!(rule.extra.contains_key("episodeFilter"));
        assert!(rule.torrent_params.extra.contains_key("save_path"));

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["episodeFilter"], "");
        assert_eq!(back["torrentParams"]["save_path"], "");
    }
}
