//! Git testing utilities

use anyhow::Result;
use std::path::Path;
use std::process::Command;

/// Runs git in `path`, failing with its stderr on a non-zero exit
pub fn git(path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(path).output()?;
    if !output.status.success() {
        anyhow::bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Sets up a git repository with user config
/// Returns Ok(()) on success, or skips test if git is not available
pub fn setup_git_repo(path: &Path) -> Result<()> {
    let init_result = Command::new("git")
        .args(["init"])
        .current_dir(path)
        .output()?;

    if !init_result.status.success() {
        anyhow::bail!("Git not available - skipping test");
    }

    git(path, &["config", "user.name", "Test User"])?;
    git(path, &["config", "user.email", "test@example.com"])?;
    // Disable commit signing for tests
    git(path, &["config", "commit.gpgsign", "false"])?;

    Ok(())
}

/// Creates a test commit in the repository
pub fn create_test_commit(
    path: &Path,
    file_name: &str,
    content: &str,
    message: &str,
) -> Result<()> {
    std::fs::write(path.join(file_name), content)?;
    git(path, &["add", file_name])?;
    git(path, &["commit", "-m", message])?;
    Ok(())
}

/// Creates a bare repository to act as `origin`
pub fn create_bare_upstream(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    git(path, &["init", "--bare"])?;
    Ok(())
}

/// Points `origin` at `upstream` and pushes the current branch with tracking
pub fn publish_to(path: &Path, upstream: &Path) -> Result<()> {
    let url = upstream.to_string_lossy();
    git(path, &["remote", "add", "origin", url.as_ref()])?;
    git(path, &["push", "-u", "origin", "HEAD"])?;
    Ok(())
}

/// Checks if git is available in the system
pub fn is_git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
