//! Public API for the core module.
//!
//! This module provides the stable public API for core functionality including:
//! - Ignore pattern matching
//! - Repository discovery
//! - The shared repository cache and its live watcher
//! - Result aggregation and reports
//! - Configuration loading
//! - The scan scheduler
//!
//! Internal implementation details are not exposed through this API.

// Ignore patterns
pub use super::filter::{matches as ignore_matches, IgnoreMatcher};

// Discovery
pub use super::discovery::{discover, path_key, MARKER_DIR};

// Cache and watching
pub use super::cache::RepoCache;
pub use super::watcher::{apply_event, LiveRepoWatcher, WatchEvent};

// Aggregation and reports
pub use super::aggregate::{
    aggregate, summarize, Severity, StateCounts, ALL_CLEAN_MESSAGE, SUMMARY_MAX_CHARS,
};
pub use super::report::{sort_statuses, RepoEntry, ScanReport};

// Configuration
pub use super::config::{
    default_config_path, get_git_concurrency, Config, ConfigError, ConfigFile, ConfigSource,
    StaticConfig, DEFAULT_DISCOVERY_INTERVAL_MINS, DEFAULT_POLL_INTERVAL_SECS,
    MIN_POLL_INTERVAL_SECS,
};

// Scheduling
pub use super::scheduler::{ScanScheduler, ScannerHandle, Signal};
