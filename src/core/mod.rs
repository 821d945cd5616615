// Internal modules - not part of public API
pub(crate) mod aggregate;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod discovery;
pub(crate) mod filter;
pub(crate) mod report;
pub(crate) mod scheduler;
pub(crate) mod watcher;

// Public API - curated exports only
pub mod api;

// Re-export key items at module level for convenience
pub use api::*;
