//! Repository state classification and the `branch.ab` tracking parser

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::core::path_key;

/// Prefix of the porcelain v2 header line carrying ahead/behind counts
pub const BRANCH_AB_PREFIX: &str = "# branch.ab ";

/// Synchronization state of one repository in one cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepoState {
    /// Up to date with its upstream, no local modifications
    Clean,
    /// Working tree has tracked or untracked changes
    Dirty,
    /// Local commits not yet pushed
    AheadOnly,
    /// Upstream commits not yet merged locally
    BehindOnly,
    /// Both ahead and behind its upstream
    Diverged,
    /// Current branch has no upstream configured
    NoUpstream,
    /// Status could not be determined
    Error,
}

impl RepoState {
    /// Returns the emoji symbol for this state
    pub fn symbol(&self) -> &str {
        match self {
            RepoState::Clean => "🟢",
            RepoState::AheadOnly | RepoState::NoUpstream => "🟡",
            RepoState::Dirty | RepoState::BehindOnly | RepoState::Diverged => "🔴",
            RepoState::Error => "🟠",
        }
    }

    /// Returns the text representation of this state
    pub fn text(&self) -> &str {
        match self {
            RepoState::Clean => "clean",
            RepoState::Dirty => "dirty",
            RepoState::AheadOnly => "ahead",
            RepoState::BehindOnly => "behind",
            RepoState::Diverged => "diverged",
            RepoState::NoUpstream => "no-upstream",
            RepoState::Error => "failed",
        }
    }
}

/// Result of checking one repository
///
/// `ahead` and `behind` are only meaningful for `AheadOnly`, `BehindOnly` and
/// `Diverged`; they are zero for every other state.
///
/// Equality compares the path case-insensitively, like the repository cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoStatus {
    pub path: PathBuf,
    pub state: RepoState,
    pub ahead: u32,
    pub behind: u32,
}

impl PartialEq for RepoStatus {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.ahead == other.ahead
            && self.behind == other.behind
            && path_key(&self.path) == path_key(&other.path)
    }
}

impl Eq for RepoStatus {}

impl RepoStatus {
    pub fn new(path: impl Into<PathBuf>, state: RepoState) -> Self {
        Self {
            path: path.into(),
            state,
            ahead: 0,
            behind: 0,
        }
    }

    pub fn error(path: impl Into<PathBuf>) -> Self {
        Self::new(path, RepoState::Error)
    }

    /// Builds a status from the raw observations of one check
    pub fn classified(
        path: impl Into<PathBuf>,
        has_modifications: bool,
        tracking: Option<(u32, u32)>,
    ) -> Self {
        let state = classify(has_modifications, tracking);
        let (ahead, behind) = match state {
            RepoState::AheadOnly | RepoState::BehindOnly | RepoState::Diverged => {
                tracking.unwrap_or_default()
            }
            _ => (0, 0),
        };
        Self {
            path: path.into(),
            state,
            ahead,
            behind,
        }
    }

    /// Final path segment, used in summaries
    pub fn name(&self) -> String {
        crate::utils::repo_name(&self.path)
    }

    /// Short tag shown next to a non-clean repository, `None` for clean ones
    pub fn display_tag(&self) -> Option<String> {
        match self.state {
            RepoState::Dirty => Some("DIRTY".to_string()),
            RepoState::AheadOnly => Some(format!("AHEAD +{}", self.ahead)),
            RepoState::BehindOnly => Some(format!("BEHIND -{}", self.behind)),
            RepoState::Diverged => Some(format!("DIV +{}/-{}", self.ahead, self.behind)),
            RepoState::NoUpstream => Some("NO-UPSTREAM".to_string()),
            RepoState::Clean | RepoState::Error => None,
        }
    }
}

/// Maps the observations of one repository to exactly one state
///
/// Modifications win over everything; a missing upstream wins over any
/// ahead/behind counts.
pub fn classify(has_modifications: bool, tracking: Option<(u32, u32)>) -> RepoState {
    if has_modifications {
        return RepoState::Dirty;
    }
    match tracking {
        None => RepoState::NoUpstream,
        Some((0, 0)) => RepoState::Clean,
        Some((_, 0)) => RepoState::AheadOnly,
        Some((0, _)) => RepoState::BehindOnly,
        Some(_) => RepoState::Diverged,
    }
}

/// A `branch.ab` line that does not follow `# branch.ab +<int> -<int>`
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed tracking line: {line:?}")]
pub struct TrackingParseError {
    pub line: String,
}

/// Extracts the (ahead, behind) pair from tracking output
///
/// Returns `Ok(None)` when no `branch.ab` line is present, which means the
/// current branch has no upstream. Every other line is ignored.
pub fn parse_branch_ab(output: &str) -> Result<Option<(u32, u32)>, TrackingParseError> {
    let Some(line) = output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with(BRANCH_AB_PREFIX.trim_end()))
    else {
        return Ok(None);
    };

    let malformed = || TrackingParseError {
        line: line.to_string(),
    };

    let mut fields = line[BRANCH_AB_PREFIX.trim_end().len()..].split_whitespace();
    let ahead = fields
        .next()
        .and_then(|f| f.strip_prefix('+'))
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(malformed)?;
    let behind = fields
        .next()
        .and_then(|f| f.strip_prefix('-'))
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(malformed)?;
    if fields.next().is_some() {
        return Err(malformed());
    }

    Ok(Some((ahead, behind)))
}
