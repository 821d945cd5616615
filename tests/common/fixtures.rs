//! Test fixtures and builders

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::git::{create_bare_upstream, create_test_commit, git, publish_to, setup_git_repo};

/// A scan root populated with repositories in known states
///
/// Bare upstreams live in a separate temp dir so discovery never sees them.
pub struct Workspace {
    pub root: TempDir,
    upstreams: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new()?,
            upstreams: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Committed repository without any upstream
    pub fn untracked_repo(&self, name: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        std::fs::create_dir_all(&path)?;
        setup_git_repo(&path)?;
        create_test_commit(&path, "README.md", &format!("# {name}"), "Initial commit")?;
        Ok(path)
    }

    /// Repository in sync with its upstream
    pub fn clean_repo(&self, name: &str) -> Result<PathBuf> {
        let path = self.untracked_repo(name)?;
        let upstream = self.upstreams.path().join(format!("{}.git", name.replace('/', "_")));
        create_bare_upstream(&upstream)?;
        publish_to(&path, &upstream)?;
        Ok(path)
    }

    /// Tracked repository with `commits` local commits not yet pushed
    pub fn ahead_repo(&self, name: &str, commits: usize) -> Result<PathBuf> {
        let path = self.clean_repo(name)?;
        for i in 0..commits {
            create_test_commit(&path, &format!("ahead-{i}.txt"), "local", "Local work")?;
        }
        Ok(path)
    }

    /// Tracked repository whose upstream gained `commits` it has fetched but not merged
    pub fn behind_repo(&self, name: &str, commits: usize) -> Result<PathBuf> {
        let path = self.clean_repo(name)?;
        let other = self.upstreams.path().join(format!("{}-other", name.replace('/', "_")));
        let url = git(&path, &["remote", "get-url", "origin"])?;
        git(self.upstreams.path(), &["clone", &url, &other.to_string_lossy()])?;
        git(&other, &["config", "user.name", "Other User"])?;
        git(&other, &["config", "user.email", "other@example.com"])?;
        git(&other, &["config", "commit.gpgsign", "false"])?;
        for i in 0..commits {
            create_test_commit(&other, &format!("remote-{i}.txt"), "remote", "Remote work")?;
        }
        git(&other, &["push"])?;
        git(&path, &["fetch"])?;
        Ok(path)
    }

    /// Tracked repository with an uncommitted file
    pub fn dirty_repo(&self, name: &str) -> Result<PathBuf> {
        let path = self.clean_repo(name)?;
        std::fs::write(path.join("scratch.txt"), "uncommitted")?;
        Ok(path)
    }
}
