//! Configuration record, defaults, and loading
//!
//! The configuration is re-read at the start of every scan cycle, so a
//! [`ConfigSource`] must be cheap to call repeatedly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

// Default concurrency cap for status checks
pub const GIT_CONCURRENT_CAP: usize = 12;

// Scheduling configuration
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_DISCOVERY_INTERVAL_MINS: u64 = 60;

// Config file location below the platform config directory
pub const CONFIG_DIR_NAME: &str = "repo-pulse";
pub const CONFIG_FILE_NAME: &str = "config.toml";

// Candidate roots (relative to the home directory) used when no config exists
pub const DEFAULT_ROOT_CANDIDATES: &[&str] = &[
    "src",
    "code",
    "projects",
    "repos",
    "dev",
    "source/repos",
    "Documents/GitHub",
];

// Baseline ignore patterns
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["node_modules", ".cargo", "go/pkg/mod"];

// Repository discovery configuration
pub const ESTIMATED_REPO_COUNT: usize = 50; // Pre-allocation hint for collections
pub const WALKER_THREAD_CAP: usize = 8;

/// Errors raised while loading configuration
///
/// A missing or unparseable file is not an error (defaults are used instead);
/// these cover the cases where the backing store itself is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
}

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Directories searched for repositories, in order
    pub roots: Vec<PathBuf>,
    /// Textual ignore patterns (see [`crate::core::IgnoreMatcher`])
    pub ignore_patterns: Vec<String>,
    pub poll_interval_seconds: u64,
    pub discovery_interval_minutes: u64,
    /// Upper bound on simultaneously running status checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_checks: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECS,
            discovery_interval_minutes: DEFAULT_DISCOVERY_INTERVAL_MINS,
            max_concurrent_checks: None,
        }
    }
}

impl Config {
    /// Config with explicit roots and patterns and default intervals
    pub fn with_roots<P: Into<PathBuf>>(roots: impl IntoIterator<Item = P>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ignore_patterns: Vec::new(),
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECS,
            discovery_interval_minutes: DEFAULT_DISCOVERY_INTERVAL_MINS,
            max_concurrent_checks: None,
        }
    }

    /// Parses a TOML document and normalizes it
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Config>(contents).map(Config::normalized)
    }

    /// Enforces the documented bounds on every field
    pub fn normalized(mut self) -> Self {
        self.roots
            .retain(|root| !root.as_os_str().to_string_lossy().trim().is_empty());
        self.ignore_patterns.retain(|p| !p.trim().is_empty());
        self.poll_interval_seconds = self.poll_interval_seconds.max(MIN_POLL_INTERVAL_SECS);
        self.max_concurrent_checks = self.max_concurrent_checks.map(|n| n.max(1));
        self
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_seconds.max(MIN_POLL_INTERVAL_SECS))
    }

    pub fn discovery_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.discovery_interval_minutes.saturating_mul(60))
    }

    /// Effective number of status checks allowed to run at once
    pub fn check_concurrency(&self) -> usize {
        get_git_concurrency(self.max_concurrent_checks)
    }
}

/// Determines the concurrency limit for status checks
///
/// Priority order:
/// 1. explicit `maxConcurrentChecks` → N
/// 2. Smart default → min(CPU_CORES + 2, 12)
pub fn get_git_concurrency(configured: Option<usize>) -> usize {
    if let Some(n) = configured {
        return n.max(1);
    }
    let cpu_count = num_cpus::get();
    (cpu_count + 2).min(GIT_CONCURRENT_CAP)
}

/// Existing directories among the usual places people keep checkouts
pub fn default_roots() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    DEFAULT_ROOT_CANDIDATES
        .iter()
        .map(|candidate| home.join(candidate))
        .filter(|path| path.is_dir())
        .collect()
}

/// Location of the config file when none is given explicitly
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

/// Backing store the scheduler reloads configuration from each cycle
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Fixed configuration, mostly useful for embedding and tests
#[derive(Debug, Clone)]
pub struct StaticConfig(pub Config);

impl ConfigSource for StaticConfig {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.0.clone().normalized())
    }
}

/// TOML file on disk, read fresh on every load
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Config file at the platform default location
    pub fn default_location() -> Result<Self, ConfigError> {
        default_config_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for ConfigFile {
    fn load(&self) -> Result<Config, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "config file not found, using defaults");
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match Config::from_toml(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "invalid config file, using defaults");
                Ok(Config::default())
            }
        }
    }
}
