//! Repository listing command

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::core::{discover, ConfigSource};

/// Walks the configured roots and prints every repository found
pub async fn handle_discover_command(source: Arc<dyn ConfigSource>) -> Result<()> {
    let config = source.load().context("loading configuration")?;
    if config.roots.is_empty() {
        println!("No roots configured.");
        return Ok(());
    }

    let roots = config.roots.clone();
    let patterns = config.ignore_patterns.clone();
    let repos = tokio::task::spawn_blocking(move || discover(&roots, &patterns))
        .await
        .context("repository discovery failed")?;

    for repo in &repos {
        println!("{}", repo.display());
    }
    let repo_word = if repos.len() == 1 {
        "repository"
    } else {
        "repositories"
    };
    println!("\n{} {} under {} root(s)", repos.len(), repo_word, config.roots.len());
    Ok(())
}
