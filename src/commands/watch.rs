//! Long-running monitor with a line-oriented console

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::render::render_report;
use crate::core::{ConfigSource, RepoEntry, ScanReport, ScanScheduler};
use crate::git::GitCli;
use crate::utils::{set_terminal_title, set_terminal_title_and_flush};

const APP_TITLE: &str = "repo-pulse";
const CONSOLE_HELP: &str = "Commands: r = rescan, o <n|path> = open repository, q = quit";

/// A line typed on the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Rescan,
    /// Open by 1-based entry number of the latest report or by path
    Open(String),
    Quit,
    Help,
    Unknown(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let command = match (head, rest) {
            ("r" | "rescan", "") => ConsoleCommand::Rescan,
            ("q" | "quit", "") => ConsoleCommand::Quit,
            ("h" | "help" | "?", "") => ConsoleCommand::Help,
            ("o" | "open", target) if !target.is_empty() => ConsoleCommand::Open(target.to_string()),
            _ => ConsoleCommand::Unknown(line.to_string()),
        };
        Some(command)
    }
}

/// Resolves an open target against the entries of the latest report
pub fn resolve_open_target(target: &str, entries: &[RepoEntry]) -> PathBuf {
    match target.parse::<usize>() {
        Ok(n) if n >= 1 && n <= entries.len() => entries[n - 1].path.clone(),
        _ => PathBuf::from(target),
    }
}

fn title_for(report: &ScanReport) -> String {
    format!("{} {}", report.severity.symbol(), APP_TITLE)
}

/// Runs the scheduler until `q` or Ctrl-C
pub async fn handle_watch_command(source: Arc<dyn ConfigSource>) -> Result<()> {
    set_terminal_title(&format!("🔍 {APP_TITLE}"));
    println!("{CONSOLE_HELP}");

    let mut handle = ScanScheduler::new(source, Arc::new(GitCli)).spawn();
    let mut reports = handle.reports();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(report) = report {
                    println!("\n{}", render_report(&report));
                    set_terminal_title_and_flush(&title_for(&report));
                }
            }
            Some(path) = handle.next_open_request() => {
                println!("open: {}", path.display());
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        debug!("console input closed");
                        stdin_open = false;
                        continue;
                    }
                };
                match ConsoleCommand::parse(&line) {
                    Some(ConsoleCommand::Rescan) => handle.rescan(),
                    Some(ConsoleCommand::Open(target)) => {
                        let entries = handle
                            .latest_report()
                            .map(|report| report.entries)
                            .unwrap_or_default();
                        handle.open_repository(resolve_open_target(&target, &entries));
                    }
                    Some(ConsoleCommand::Quit) => break,
                    Some(ConsoleCommand::Help) => println!("{CONSOLE_HELP}"),
                    Some(ConsoleCommand::Unknown(input)) => {
                        println!("Unknown command: {input}\n{CONSOLE_HELP}");
                    }
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("shutting down");
    handle.shutdown().await?;
    set_terminal_title_and_flush(APP_TITLE);
    Ok(())
}
