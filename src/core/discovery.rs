//! Repository discovery under the configured roots

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::{ESTIMATED_REPO_COUNT, WALKER_THREAD_CAP};
use super::filter::IgnoreMatcher;

/// Name of the marker directory that identifies a repository root
pub const MARKER_DIR: &str = ".git";

/// Case-insensitive identity key for a repository path
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Makes a path absolute without touching the filesystem
pub(crate) fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Walks every root and returns the repositories found, de-duplicated
/// case-insensitively and sorted by lower-cased path
///
/// Blank and nonexistent roots are skipped. Unreadable subtrees are logged and
/// skipped so the rest of the walk still contributes.
pub fn discover<P: AsRef<Path>, S: AsRef<str>>(roots: &[P], ignore_patterns: &[S]) -> Vec<PathBuf> {
    let matcher = Arc::new(IgnoreMatcher::new(ignore_patterns));
    let repos: Arc<DashMap<String, PathBuf>> =
        Arc::new(DashMap::with_capacity(ESTIMATED_REPO_COUNT));

    for root in roots {
        let root = root.as_ref();
        if root.as_os_str().to_string_lossy().trim().is_empty() {
            continue;
        }
        if !root.is_dir() {
            debug!(root = %root.display(), "skipping missing root");
            continue;
        }
        let before = repos.len();
        walk_root(&absolutize(root), &matcher, &repos);
        debug!(
            root = %root.display(),
            found = repos.len() - before,
            "root walked"
        );
    }

    let mut found: Vec<PathBuf> = Arc::try_unwrap(repos)
        .map(|map| map.into_iter().map(|(_, path)| path).collect())
        .unwrap_or_else(|arc| arc.iter().map(|r| r.value().clone()).collect());

    found.par_sort_by_cached_key(|path| path_key(path));
    info!(repos = found.len(), "discovery finished");
    found
}

fn walk_root(root: &Path, matcher: &Arc<IgnoreMatcher>, repos: &Arc<DashMap<String, PathBuf>>) {
    let filter_matcher = Arc::clone(matcher);
    let filter_repos = Arc::clone(repos);

    let walker = WalkBuilder::new(root)
        .standard_filters(false) // .gitignore files must not hide nested repos
        .follow_links(false)
        .threads(num_cpus::get().min(WALKER_THREAD_CAP))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir {
                return false;
            }

            if entry.file_name() == MARKER_DIR {
                if let Some(repo_path) = entry.path().parent() {
                    if filter_matcher.matches(repo_path) {
                        debug!(path = %repo_path.display(), "ignoring repository");
                    } else if let Entry::Vacant(slot) = filter_repos.entry(path_key(repo_path)) {
                        slot.insert(repo_path.to_path_buf());
                    }
                }
                // Never descend into the marker itself
                return false;
            }

            !(entry.depth() > 0 && filter_matcher.prunes(entry.path()))
        })
        .build_parallel();

    walker.run(|| {
        Box::new(|result| {
            if let Err(e) = result {
                warn!(error = %e, "skipping unreadable path during discovery");
            }
            ignore::WalkState::Continue
        })
    });
}
