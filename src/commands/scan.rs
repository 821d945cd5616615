//! One-shot scan command

use anyhow::{bail, Result};
use std::sync::Arc;

use super::render::render_report;
use crate::core::{ConfigSource, ScanScheduler};
use crate::git::GitCli;

/// Runs a single cycle and prints its report
///
/// Fails when the cycle itself failed, so scripts can tell a broken scan from
/// a red one.
pub async fn handle_scan_command(source: Arc<dyn ConfigSource>, json: bool) -> Result<()> {
    let mut scheduler = ScanScheduler::new(source, Arc::new(GitCli)).without_watcher();
    let report = scheduler.run_cycle().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report));
    }

    let no_roots = scheduler.config().is_some_and(|config| config.roots.is_empty());
    if no_roots && !json {
        println!("No roots configured; set `roots` in the file shown by `repo-pulse config`.");
    }

    if report.is_global_error() {
        bail!("{}", report.summary);
    }
    Ok(())
}
