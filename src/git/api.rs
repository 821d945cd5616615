//! Public API for git status checking.
//!
//! This module provides the stable public API for the git-facing side:
//! - Repository state classification
//! - Tracking output parsing
//! - Concurrent status checks across a snapshot
//!
//! ## Example: Checking a repository
//!
//! ```rust,no_run
//! use repo_pulse::git::{check_repo, GitCli};
//! use std::path::Path;
//!
//! async fn check(path: &Path) {
//!     let status = check_repo(&GitCli, path).await;
//!     println!("{} {}", status.state.symbol(), status.state.text());
//! }
//! ```

// Status model
pub use super::status::{
    classify, parse_branch_ab, RepoState, RepoStatus, TrackingParseError, BRANCH_AB_PREFIX,
};

// Command execution
pub use super::operations::{is_git_available, run_git, GitCli, GitOutput, VcsQuery};

// Checking
pub use super::checker::{check_repo, StatusChecker};
