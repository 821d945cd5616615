//! Published outcome of a scan cycle

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::aggregate::{aggregate, truncate_chars, Severity, SUMMARY_MAX_CHARS};
use super::discovery::path_key;
use crate::git::{RepoState, RepoStatus};

/// A non-clean repository as shown by the presentation layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    pub path: PathBuf,
    pub state: RepoState,
    pub tag: String,
}

/// Everything the presentation layer needs after one cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub severity: Severity,
    /// At most 120 characters
    pub summary: String,
    /// All results, sorted by path case-insensitively
    pub statuses: Vec<RepoStatus>,
    /// Tagged non-clean repositories, in the same order as `statuses`
    pub entries: Vec<RepoEntry>,
    pub completed_at: DateTime<Local>,
}

impl ScanReport {
    /// Sorts the results and reduces them into a report
    pub fn from_statuses(mut statuses: Vec<RepoStatus>) -> Self {
        sort_statuses(&mut statuses);
        let (severity, summary) = aggregate(&statuses);
        let entries = statuses
            .iter()
            .filter_map(|status| {
                status.display_tag().map(|tag| RepoEntry {
                    path: status.path.clone(),
                    state: status.state,
                    tag,
                })
            })
            .collect();

        Self {
            severity,
            summary,
            statuses,
            entries,
            completed_at: Local::now(),
        }
    }

    /// Report for a cycle that failed as a whole
    pub fn global_error(message: impl std::fmt::Display) -> Self {
        Self {
            severity: Severity::GlobalError,
            summary: truncate_chars(&format!("Scan failed: {message}"), SUMMARY_MAX_CHARS),
            statuses: Vec::new(),
            entries: Vec::new(),
            completed_at: Local::now(),
        }
    }

    pub fn is_global_error(&self) -> bool {
        self.severity == Severity::GlobalError
    }
}

/// Orders results by path, ignoring case
pub fn sort_statuses(statuses: &mut [RepoStatus]) {
    statuses.sort_by_cached_key(|s| path_key(&s.path));
}
