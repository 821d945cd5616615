//! File system path helpers for display

use std::path::Path;

pub const UNKNOWN_REPO_NAME: &str = "unknown";

/// Final path segment of a repository, used as its display name
pub fn repo_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNKNOWN_REPO_NAME.to_string())
}

/// Shortens long paths for display
pub fn shorten_path(path: &str, max_length: usize) -> String {
    if path.chars().count() <= max_length {
        return path.to_string();
    }

    let separator = if path.contains('\\') && !path.contains('/') {
        '\\'
    } else {
        '/'
    };
    let components: Vec<&str> = path.split(separator).filter(|s| !s.is_empty()).collect();
    if components.len() <= 2 {
        // Too few components to shorten meaningfully
        return path.to_string();
    }

    // Keep last 2 components with ellipsis prefix
    format!(
        "...{sep}{}{sep}{}",
        components[components.len() - 2],
        components[components.len() - 1],
        sep = separator
    )
}
