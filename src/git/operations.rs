//! Git command execution and the two status queries

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

// Git command arguments
pub const GIT_SHORT_STATUS_ARGS: &[&str] = &["status", "--porcelain"];
pub const GIT_TRACKING_STATUS_ARGS: &[&str] = &["status", "--porcelain=v2", "--branch"];

/// Captured result of one git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs a git command in the specified directory
///
/// A non-zero exit is reported through [`GitOutput::success`]; only a failure
/// to launch or wait on the process is an `Err`. No timeout is applied; a hung
/// process stalls only the repository it belongs to.
pub async fn run_git(path: &Path, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        // Read-only queries must not take the index lock from under the user
        .env("GIT_OPTIONAL_LOCKS", "0")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to run git {} in {}", args.join(" "), path.display()))?;

    Ok(GitOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// The two textual queries issued against every repository
///
/// Implemented by [`GitCli`] for real repositories; tests substitute scripted
/// answers.
#[async_trait]
pub trait VcsQuery: Send + Sync {
    /// Short-form status; non-empty output on success means "has modifications"
    async fn short_status(&self, path: &Path) -> Result<GitOutput>;

    /// Branch tracking status containing at most one `# branch.ab` line
    async fn tracking_status(&self, path: &Path) -> Result<GitOutput>;
}

/// [`VcsQuery`] backed by the `git` executable on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

#[async_trait]
impl VcsQuery for GitCli {
    async fn short_status(&self, path: &Path) -> Result<GitOutput> {
        run_git(path, GIT_SHORT_STATUS_ARGS).await
    }

    async fn tracking_status(&self, path: &Path) -> Result<GitOutput> {
        run_git(path, GIT_TRACKING_STATUS_ARGS).await
    }
}

/// Checks if git is available in the system
pub async fn is_git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
