//! Reduction of per-repository results into one severity and summary line

use serde::{Deserialize, Serialize};

use super::discovery::path_key;
use crate::git::{RepoState, RepoStatus};

pub const SUMMARY_MAX_CHARS: usize = 120;
pub const SUMMARY_EXAMPLE_LIMIT: usize = 3;
pub const ALL_CLEAN_MESSAGE: &str = "All repositories clean.";

/// Overall signal for a cycle, most severe last
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Green,
    Yellow,
    Red,
    /// The cycle itself failed; no repository results are available
    GlobalError,
}

impl Severity {
    /// Severity contributed by a single repository
    ///
    /// `Error` is informational and never raises the level.
    pub fn of(state: RepoState) -> Self {
        match state {
            RepoState::Dirty | RepoState::BehindOnly | RepoState::Diverged => Severity::Red,
            RepoState::AheadOnly | RepoState::NoUpstream => Severity::Yellow,
            RepoState::Clean | RepoState::Error => Severity::Green,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Severity::Green => "🟢",
            Severity::Yellow => "🟡",
            Severity::Red => "🔴",
            Severity::GlobalError => "⚠️",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Severity::Green => "green",
            Severity::Yellow => "yellow",
            Severity::Red => "red",
            Severity::GlobalError => "error",
        }
    }
}

/// Per-category counts feeding the summary
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateCounts {
    pub dirty: usize,
    pub unpushed: usize,
    pub behind: usize,
    pub no_upstream: usize,
    pub errors: usize,
}

impl StateCounts {
    pub fn tally(statuses: &[RepoStatus]) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status.state {
                RepoState::Dirty => counts.dirty += 1,
                RepoState::AheadOnly => counts.unpushed += 1,
                RepoState::BehindOnly | RepoState::Diverged => counts.behind += 1,
                RepoState::NoUpstream => counts.no_upstream += 1,
                RepoState::Error => counts.errors += 1,
                RepoState::Clean => {}
            }
        }
        counts
    }

    fn is_all_clean(&self) -> bool {
        self.dirty == 0 && self.unpushed == 0 && self.behind == 0 && self.no_upstream == 0
    }
}

/// Reduces a cycle's results into `(severity, summary)`
///
/// Pure and order-independent: the same statuses in any order give the same
/// output.
pub fn aggregate(statuses: &[RepoStatus]) -> (Severity, String) {
    let severity = statuses
        .iter()
        .map(|s| Severity::of(s.state))
        .max()
        .unwrap_or(Severity::Green);

    (severity, summarize(statuses))
}

/// Builds the bounded summary line
pub fn summarize(statuses: &[RepoStatus]) -> String {
    let counts = StateCounts::tally(statuses);
    if counts.is_all_clean() {
        return ALL_CLEAN_MESSAGE.to_string();
    }

    let mut clauses = Vec::with_capacity(4);
    if counts.dirty > 0 {
        clauses.push(format!("Dirty: {}.", counts.dirty));
    }
    if counts.unpushed > 0 {
        clauses.push(format!("Unpushed: {}.", counts.unpushed));
    }
    if counts.behind > 0 {
        clauses.push(format!("Behind: {}.", counts.behind));
    }
    if counts.no_upstream > 0 {
        clauses.push(format!("No upstream: {}.", counts.no_upstream));
    }
    let mut summary = clauses.join(" ");

    let mut sorted: Vec<&RepoStatus> = statuses.iter().collect();
    sorted.sort_by_cached_key(|s| path_key(&s.path));
    let examples: Vec<String> = sorted
        .into_iter()
        .filter(|s| !matches!(s.state, RepoState::Clean | RepoState::NoUpstream))
        .take(SUMMARY_EXAMPLE_LIMIT)
        .map(RepoStatus::name)
        .collect();
    if !examples.is_empty() {
        summary.push_str(" e.g. ");
        summary.push_str(&examples.join(", "));
    }

    truncate_chars(&summary, SUMMARY_MAX_CHARS)
}

/// Cuts a string to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
