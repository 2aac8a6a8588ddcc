//! Shared library for the bangumi organizer tools.
//!
//! This crate provides common functionality used by both binary crates:
//! - Configuration management
//! - Tag-role and torrent models
//! - Release-name parsing
//! - Job classification (library layout + tag transitions)
//! - qBittorrent Web API client
//! - Logging infrastructure

pub mod classify;
pub mod config;
pub mod logging;
pub mod models;
pub mod qbit;
pub mod release;

// Re-export commonly used types
pub use classify::{Classification, ClassificationDecision, Classifier, ClassifyError, FileNormalization};
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;
pub use qbit::QbClient;
pub use release::{ParseError, ReleaseInfo, ReleaseKind};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
