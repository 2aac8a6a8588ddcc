//! Torrent classification: decides the library layout and tag transition for
//! one completed torrent.
//!
//! Classification is pure: it computes a [`ClassificationDecision`] from the
//! torrent snapshot and the configuration, and never performs I/O itself.
//! Applying the decision (moves, renames, tag removal) is the worker's job.

use crate::models::{Lifecycle, TagMap, TagRole, Torrent, TorrentFile};
use crate::release::{self, ReleaseKind};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal classification failures. Each one is isolated to its torrent and
/// needs operator attention; an unparseable name usually means a new release
/// pattern has to be added.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("torrent carries no known lifecycle tag: {tags:?}")]
    UnknownTagState { tags: Vec<String> },
    #[error("no release pattern matched name: {name}")]
    UnparseableName { name: String },
}

/// Everything the worker has to apply for one torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationDecision {
    /// The parsed release, kept for decision traces
    pub release: release::ReleaseInfo,
    /// Library directory the torrent content moves to
    pub target_path: PathBuf,
    /// Old -> new rename of the torrent's top-level folder (batch only)
    pub folder_rename: Option<(String, String)>,
    /// Old -> new per-file renames inside the torrent (batch only)
    pub file_renames: Vec<(String, String)>,
    /// Torrent-relative directories that should receive an empty marker
    /// file, hiding them from the downstream media scanner
    pub sentinel_dirs: Vec<PathBuf>,
    /// Tag roles to strip once everything is applied
    pub tags_to_remove: Vec<TagRole>,
}

/// Outcome of classifying one torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Decision(ClassificationDecision),
    /// Todo tag already removed; silent no-op
    AlreadyHandled,
}

/// Per-file normalization result for a batch torrent, computed by
/// [`Classifier::normalize_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileNormalization {
    pub renames: Vec<(String, String)>,
    pub sentinel_dirs: Vec<PathBuf>,
}

impl FileNormalization {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.sentinel_dirs.is_empty()
    }
}

/// Decides, for each completed torrent, where it belongs in the library and
/// which tags to strip.
#[derive(Debug, Clone)]
pub struct Classifier {
    tag_map: TagMap,
    library: PathBuf,
}

impl Classifier {
    pub fn new(tag_map: TagMap, library: impl Into<PathBuf>) -> Self {
        Self {
            tag_map,
            library: library.into(),
        }
    }

    /// Classify one completed torrent.
    ///
    /// The caller must only pass torrents with `progress == 1.0`; the listing
    /// filter takes care of that.
    pub fn classify(&self, torrent: &Torrent, force: bool) -> Result<Classification, ClassifyError> {
        let state = self.tag_map.state_of(&torrent.tags);

        if !force && !state.todo {
            return Ok(Classification::AlreadyHandled);
        }

        let preferred = match state.lifecycle {
            Some(Lifecycle::Completed) => ReleaseKind::Batch,
            Some(Lifecycle::Ongoing) => ReleaseKind::Single,
            None => {
                return Err(ClassifyError::UnknownTagState {
                    tags: torrent.tags.clone(),
                })
            }
        };

        let info = release::parse(&torrent.name, preferred).map_err(|_| {
            ClassifyError::UnparseableName {
                name: torrent.name.clone(),
            }
        })?;

        let season_dir = format!("S{:02}", info.season);
        let decision = match info.kind {
            ReleaseKind::Batch => ClassificationDecision {
                target_path: self.library.join(&info.title),
                folder_rename: Some((torrent.name.clone(), season_dir)),
                file_renames: Vec::new(),
                sentinel_dirs: Vec::new(),
                tags_to_remove: vec![TagRole::Todo],
                release: info,
            },
            ReleaseKind::Single => ClassificationDecision {
                target_path: self.library.join(&info.title).join(season_dir),
                folder_rename: None,
                file_renames: Vec::new(),
                sentinel_dirs: Vec::new(),
                tags_to_remove: vec![TagRole::Todo],
                release: info,
            },
        };

        Ok(Classification::Decision(decision))
    }

    /// Compute per-file renames and sentinel placements for a batch torrent.
    ///
    /// Flat episode files (`<folder>/<file>`) are renamed to their canonical
    /// form when they match a single-episode pattern; anything that does not
    /// match (openings, extras) is left untouched. Nested subfolders
    /// (`<folder>/<sub>/<file>`) cannot be renamed safely, so in local mode
    /// their directory is marked for a sentinel file instead. Without
    /// filesystem access there is nothing we can do about them.
    pub fn normalize_files(&self, files: &[TorrentFile], local_mode: bool) -> FileNormalization {
        let mut renames = Vec::new();
        let mut sentinels = BTreeSet::new();

        for file in files {
            let segments: Vec<&str> = file.path.split('/').collect();
            match segments.as_slice() {
                [folder, name] => {
                    let Ok(info) = release::parse_single(name) else {
                        continue;
                    };
                    let canonical = info.filename(false);
                    if canonical != *name {
                        renames.push((file.path.clone(), format!("{folder}/{canonical}")));
                    }
                }
                [folder, sub, _] if local_mode => {
                    sentinels.insert(PathBuf::from(folder).join(sub));
                }
                _ => {}
            }
        }

        FileNormalization {
            renames,
            sentinel_dirs: sentinels.into_iter().collect(),
        }
    }

    pub fn tag_map(&self) -> &TagMap {
        &self.tag_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(TagMap::new("RSS", "完结", "连载"), "/jellyfin/anime")
    }

    fn torrent(name: &str, tags: &[&str]) -> Torrent {
        let json = serde_json::json!({
            "hash": "0123456789abcdef",
            "name": name,
            "progress": 1.0,
            "tags": tags.join(", "),
            "save_path": "/downloads",
            "category": "动漫",
        });
        serde_json::from_value(json).unwrap()
    }

    fn file(path: &str) -> TorrentFile {
        serde_json::from_value(serde_json::json!({ "name": path, "size": 1000 })).unwrap()
    }

    #[test]
    fn test_single_episode_decision() {
        let t = torrent("[Group] Show Name - 05 [1080p].mkv", &["RSS", "连载"]);
        let Classification::Decision(d) = classifier().classify(&t, false).unwrap() else {
            panic!("expected a decision");
        };
        assert_eq!(d.target_path, PathBuf::from("/jellyfin/anime/Show Name/S01"));
        assert_eq!(d.folder_rename, None);
        assert_eq!(d.release.kind, ReleaseKind::Single);
        assert_eq!(d.release.episode, Some(5));
        assert_eq!(d.tags_to_remove, vec![TagRole::Todo]);
    }

    #[test]
    fn test_batch_decision() {
        let t = torrent("[Group] Show Name S02 [01-12][Batch]", &["RSS", "完结"]);
        let Classification::Decision(d) = classifier().classify(&t, false).unwrap() else {
            panic!("expected a decision");
        };
        assert_eq!(d.target_path, PathBuf::from("/jellyfin/anime/Show Name"));
        assert_eq!(
            d.folder_rename,
            Some(("[Group] Show Name S02 [01-12][Batch]".to_string(), "S02".to_string()))
        );
        assert_eq!(d.release.kind, ReleaseKind::Batch);
    }

    #[test]
    fn test_already_handled_without_todo_tag() {
        let t = torrent("[Group] Show Name - 05 [1080p].mkv", &["连载"]);
        assert_eq!(
            classifier().classify(&t, false).unwrap(),
            Classification::AlreadyHandled
        );
    }

    #[test]
    fn test_force_overrides_missing_todo_tag() {
        let t = torrent("[Group] Show Name - 05 [1080p].mkv", &["连载"]);
        assert!(matches!(
            classifier().classify(&t, true).unwrap(),
            Classification::Decision(_)
        ));
    }

    #[test]
    fn test_unknown_tag_state_is_fatal() {
        let t = torrent("[Group] Show Name - 05 [1080p].mkv", &["RSS", "BT"]);
        assert!(matches!(
            classifier().classify(&t, false),
            Err(ClassifyError::UnknownTagState { .. })
        ));
    }

    #[test]
    fn test_unparseable_name_is_fatal() {
        let t = torrent("totally wrong name", &["RSS", "连载"]);
        assert!(matches!(
            classifier().classify(&t, false),
            Err(ClassifyError::UnparseableName { .. })
        ));
    }

    #[test]
    fn test_ongoing_tag_still_accepts_batch_name() {
        // Preferred parse fails, fallback kicks in
        let t = torrent("[Group] Show Name S02 [01-12 FIN][1080p]", &["RSS", "连载"]);
        let Classification::Decision(d) = classifier().classify(&t, false).unwrap() else {
            panic!("expected a decision");
        };
        assert_eq!(d.release.kind, ReleaseKind::Batch);
        assert!(d.folder_rename.is_some());
    }

    #[test]
    fn test_normalize_renames_flat_episode_files() {
        let files = vec![
            file("Show S02/[G] Show 2 - 01v2 [1080p].mkv"),
            file("Show S02/[G] Show 2 - 02 [1080p].mkv"),
            file("Show S02/credits.txt"),
        ];
        let norm = classifier().normalize_files(&files, false);
        // v2 file renames to canonical form, 02 is canonical already minus
        // the season marker, credits.txt does not parse and stays put
        assert_eq!(
            norm.renames,
            vec![
                (
                    "Show S02/[G] Show 2 - 01v2 [1080p].mkv".to_string(),
                    "Show S02/[G] Show - 01 [1080p].mkv".to_string()
                ),
                (
                    "Show S02/[G] Show 2 - 02 [1080p].mkv".to_string(),
                    "Show S02/[G] Show - 02 [1080p].mkv".to_string()
                ),
            ]
        );
        assert!(norm.sentinel_dirs.is_empty());
    }

    #[test]
    fn test_normalize_skips_canonical_names() {
        let files = vec![file("Show/[G] Show - 01 [1080p].mkv")];
        let norm = classifier().normalize_files(&files, true);
        assert!(norm.is_empty());
    }

    #[test]
    fn test_normalize_marks_nested_dirs_in_local_mode() {
        let files = vec![
            file("Show/extras/NCOP.mkv"),
            file("Show/extras/NCED.mkv"),
            file("Show/specials/SP01.mkv"),
        ];
        let norm = classifier().normalize_files(&files, true);
        assert_eq!(
            norm.sentinel_dirs,
            vec![PathBuf::from("Show/extras"), PathBuf::from("Show/specials")]
        );
        assert!(norm.renames.is_empty());
    }

    #[test]
    fn test_normalize_ignores_nested_dirs_without_local_mode() {
        let files = vec![file("Show/extras/NCOP.mkv")];
        let norm = classifier().normalize_files(&files, false);
        assert!(norm.is_empty());
    }

    #[test]
    fn test_normalize_ignores_other_depths() {
        let files = vec![file("README.txt"), file("a/b/c/d.mkv")];
        let norm = classifier().normalize_files(&files, true);
        assert!(norm.is_empty());
    }
}
