//! Command handlers for the `repo-pulse` binary

pub mod config;
pub mod discover;
pub mod render;
pub mod scan;
pub mod watch;

pub use config::handle_config_command;
pub use discover::handle_discover_command;
pub use scan::handle_scan_command;
pub use watch::handle_watch_command;
