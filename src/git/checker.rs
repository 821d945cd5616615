//! Concurrent status checking across many repositories

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::operations::{GitCli, VcsQuery};
use super::status::{parse_branch_ab, RepoState, RepoStatus};

/// Checks every repository of a snapshot, one task per repository
///
/// At most `limit` checks run at once. The bound only changes throughput; each
/// repository is classified exactly as it would be on its own.
#[derive(Clone)]
pub struct StatusChecker {
    query: Arc<dyn VcsQuery>,
    limit: usize,
}

impl StatusChecker {
    pub fn new(query: Arc<dyn VcsQuery>, limit: usize) -> Self {
        Self {
            query,
            limit: limit.max(1),
        }
    }

    /// Checker that shells out to the `git` executable
    pub fn git(limit: usize) -> Self {
        Self::new(Arc::new(GitCli), limit)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns one status per input path, in completion order
    ///
    /// Completes once every check has finished. A failing or panicking check
    /// yields `Error` for its own repository and nothing else.
    pub async fn check_all(&self, paths: &[PathBuf]) -> Vec<RepoStatus> {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut pending = FuturesUnordered::new();

        for path in paths {
            let query = Arc::clone(&self.query);
            let semaphore = Arc::clone(&semaphore);
            let task_path = path.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                check_repo(query.as_ref(), &task_path).await
            });

            let path = path.clone();
            pending.push(async move {
                match handle.await {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "status check task failed");
                        RepoStatus::error(path)
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(paths.len());
        while let Some(status) = pending.next().await {
            results.push(status);
        }
        results
    }
}

/// Classifies a single repository, turning any failure into `Error`
pub async fn check_repo(query: &dyn VcsQuery, path: &Path) -> RepoStatus {
    match probe(query, path).await {
        Ok(status) => {
            debug!(
                path = %path.display(),
                state = status.state.text(),
                ahead = status.ahead,
                behind = status.behind,
                "repository checked"
            );
            status
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "status check failed");
            RepoStatus::error(path)
        }
    }
}

async fn probe(query: &dyn VcsQuery, path: &Path) -> Result<RepoStatus> {
    let short = query.short_status(path).await?;
    if short.success && !short.stdout.trim().is_empty() {
        return Ok(RepoStatus::classified(path, true, None));
    }

    let tracking = query.tracking_status(path).await?;
    if !tracking.success {
        debug!(path = %path.display(), stderr = %tracking.stderr, "tracking query failed");
        return Ok(RepoStatus::new(path, RepoState::Error));
    }

    let ahead_behind = parse_branch_ab(&tracking.stdout)?;
    Ok(RepoStatus::classified(path, false, ahead_behind))
}
