//! # repo-pulse
//!
//! `repo-pulse` keeps an eye on every Git working copy under a set of root
//! folders and reduces their sync state to one traffic-light signal.
//!
//! ## Core Features
//!
//! - **Fast Discovery**: Parallel repository scanning using `ignore` and `rayon`.
//! - **Live Updates**: New repositories are picked up as soon as their `.git` appears.
//! - **Concurrent Checks**: Bounded fan-out of read-only `git status` queries.
//! - **One Signal**: Green, yellow or red plus a short summary line per cycle.
//!
//! ## Example
//!
//! ```rust,no_run
//! use repo_pulse::core::{discover, ScanReport};
//! use repo_pulse::git::StatusChecker;
//!
//! #[tokio::main]
//! async fn main() {
//!     let repos = discover(&["/home/me/src"], &["node_modules"]);
//!     let statuses = StatusChecker::git(8).check_all(&repos).await;
//!     let report = ScanReport::from_statuses(statuses);
//!     println!("{} {}", report.severity.symbol(), report.summary);
//! }
//! ```

pub mod commands;
pub mod core;
pub mod git;
pub mod utils;
