//! repo-pulse: continuous sync-state monitor for many git repositories

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command as ClapCommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use repo_pulse::commands::{
    handle_config_command, handle_discover_command, handle_scan_command, handle_watch_command,
};
use repo_pulse::core::ConfigFile;

fn build_cli() -> ClapCommand {
    ClapCommand::new("repo-pulse")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watches many git repositories and reports their sync state")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Configuration file to use instead of the default location"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            ClapCommand::new("watch")
                .about("Scan periodically and react to console commands (default)"),
        )
        .subcommand(
            ClapCommand::new("scan")
                .about("Run a single scan cycle and print the report")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(ClapCommand::new("discover").about("List repositories under the configured roots"))
        .subcommand(ClapCommand::new("config").about("Show the effective configuration"))
}

/// Logs go to stderr so reports on stdout stay machine-readable
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn config_file(matches: &ArgMatches) -> Result<ConfigFile> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => Ok(ConfigFile::new(path.clone())),
        None => Ok(ConfigFile::default_location()?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let source = config_file(&matches)?;

    match matches.subcommand() {
        Some(("scan", sub)) => handle_scan_command(Arc::new(source), sub.get_flag("json")).await,
        Some(("discover", _)) => handle_discover_command(Arc::new(source)).await,
        Some(("config", _)) => handle_config_command(&source),
        _ => handle_watch_command(Arc::new(source)).await,
    }
}
