//! Release-name parsing.
//!
//! Fansub release names follow several competing, loosely-standardized
//! conventions. Instead of one brittle grammar, each naming convention gets
//! its own compiled pattern; patterns are tried in declaration order and the
//! first structural match wins.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// What a release name describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// One episode file
    Single,
    /// A full season/run bundled as a folder
    Batch,
}

impl std::fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseKind::Single => write!(f, "single"),
            ReleaseKind::Batch => write!(f, "batch"),
        }
    }
}

/// Structured result of parsing one release name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub kind: ReleaseKind,
    /// Release groups, split on `&`, order-preserving
    pub groups: Vec<String>,
    /// Series title, whitespace-trimmed
    pub title: String,
    /// Season number, 1 when the name carries no season marker
    pub season: u32,
    /// Episode number, present only for `Single`
    pub episode: Option<u32>,
    /// Revision counter (`v2`, `v3`, ...), 1 when absent
    pub version: u32,
    /// Metadata tokens from the trailing bracketed block
    pub meta: Vec<String>,
    /// File extension, present only for `Single`
    pub ext: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// No pattern in the relevant set matched. Expected outcome, used for
    /// cascading fallback.
    #[error("no release pattern matched name: {0}")]
    NoMatch(String),
}

// All patterns share the same group layout:
//   1 group list, 2 title, 3 optional season, then for single releases
//   4 episode, 5 optional version, 6 metadata block, 7 extension,
//   and for batch releases 4 metadata block.
// The season marker accepts `S2`, `Season 2`, `Season2` or a bare trailing
// number before the episode/metadata part.

static SINGLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // [group] title - episode [meta].ext
        Regex::new(r"^\[(.*?)\] (.*?)(?: (?:S(?:eason ?)?)?(\d+))? - (\d+)(?:v(\d+))? \[(.*)\]\.(.*)$")
            .unwrap(),
        // [group] title [episode][meta].ext
        Regex::new(r"^\[(.*?)\] (.*?)(?: (?:S(?:eason ?)?)?(\d+))? \[(\d+)(?:v(\d+))?\]\[(.*)\]\.(.*)$")
            .unwrap(),
        // [group] title 第episode話 (meta).ext
        Regex::new(r"^\[(.*?)\] (.*?)(?: (?:S(?:eason ?)?)?(\d+))? 第(\d+)[話话集](?:v(\d+))? \((.*)\)\.(.*)$")
            .unwrap(),
    ]
});

static BATCH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // [group] title [episodes][meta] -- the episode-range bracket
        // ([01-12 FIN], [01-12 FIN+SP]) is recognized so it does not end up
        // in the title, but it is not retained in the result.
        Regex::new(r"^\[(.*?)\] (.*?)(?: (?:S(?:eason ?)?)?(\d+))? ?(?:\[(?:\d+)-(?:\d+)(?: ?[Ff][Ii][Nn])(?:\+SP)?\])?\[(.*)\]$")
            .unwrap(),
    ]
});

/// Try the single-episode patterns in priority order.
pub fn parse_single(name: &str) -> Result<ReleaseInfo, ParseError> {
    for pattern in SINGLE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(name) {
            return Ok(ReleaseInfo {
                kind: ReleaseKind::Single,
                groups: split_groups(&caps[1]),
                title: caps[2].trim().to_string(),
                season: opt_number(caps.get(3)).unwrap_or(1),
                episode: Some(number(&caps[4])),
                version: opt_number(caps.get(5)).unwrap_or(1),
                meta: split_meta(&caps[6]),
                ext: Some(caps[7].to_string()),
            });
        }
    }
    Err(ParseError::NoMatch(name.to_string()))
}

/// Try the batch (full-run folder) patterns in priority order.
pub fn parse_batch(name: &str) -> Result<ReleaseInfo, ParseError> {
    for pattern in BATCH_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(name) {
            return Ok(ReleaseInfo {
                kind: ReleaseKind::Batch,
                groups: split_groups(&caps[1]),
                title: caps[2].trim().to_string(),
                season: opt_number(caps.get(3)).unwrap_or(1),
                episode: None,
                version: 1,
                meta: split_meta(&caps[4]),
                ext: None,
            });
        }
    }
    Err(ParseError::NoMatch(name.to_string()))
}

/// Parse a release name, trying the preferred kind first and falling back to
/// the other. Fails only when both parsers fail.
pub fn parse(name: &str, preferred: ReleaseKind) -> Result<ReleaseInfo, ParseError> {
    match preferred {
        ReleaseKind::Single => parse_single(name).or_else(|_| parse_batch(name)),
        ReleaseKind::Batch => parse_batch(name).or_else(|_| parse_single(name)),
    }
}

impl ReleaseInfo {
    /// Render the canonical name for this release.
    ///
    /// The version suffix is never re-emitted: a `v2` re-release normalizes
    /// to the same canonical name as the file it replaces, so the library
    /// name stays stable across revisions.
    pub fn filename(&self, with_season: bool) -> String {
        let groups = self.groups.join("&");
        let season = if with_season {
            format!(" S{:02}", self.season)
        } else {
            String::new()
        };
        let meta = self.meta.join(" ");
        match self.kind {
            ReleaseKind::Batch => {
                format!("[{}] {}{} [{}]", groups, self.title, season, meta)
            }
            ReleaseKind::Single => format!(
                "[{}] {}{} - {:02} [{}].{}",
                groups,
                self.title,
                season,
                self.episode.unwrap_or(0),
                meta,
                self.ext.as_deref().unwrap_or(""),
            ),
        }
    }
}

fn split_groups(raw: &str) -> Vec<String> {
    raw.split('&').map(str::to_string).collect()
}

/// Adjacent closing+opening brackets collapse to a single space, so
/// multi-bracket metadata blocks become one token list.
fn split_meta(raw: &str) -> Vec<String> {
    raw.replace("][", " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn number(raw: &str) -> u32 {
    // Capture groups are \d+ so this cannot fail for realistic lengths
    raw.parse().unwrap_or(0)
}

fn opt_number(cap: Option<regex::Match<'_>>) -> Option<u32> {
    cap.map(|m| number(m.as_str()))
}
