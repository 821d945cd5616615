//! Live detection of repositories created between discovery cycles
//!
//! Filesystem callbacks never touch the cache. They only push [`WatchEvent`]s onto
//! a channel; the scheduler drains that channel in its own task and calls
//! [`apply_event`], which keeps ordering deterministic and lets tests inject
//! events without a real filesystem.

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::cache::RepoCache;
use super::discovery::{absolutize, MARKER_DIR};
use super::filter::IgnoreMatcher;

/// Message sent from a filesystem subscription to the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A marker directory appeared; carries the repository root (its parent)
    MarkerCreated(PathBuf),
}

/// One recursive subscription per configured root
pub struct LiveRepoWatcher {
    events: UnboundedSender<WatchEvent>,
    subscriptions: Vec<(PathBuf, RecommendedWatcher)>,
}

impl LiveRepoWatcher {
    pub fn new(events: UnboundedSender<WatchEvent>) -> Self {
        Self {
            events,
            subscriptions: Vec::new(),
        }
    }

    /// Drops every existing subscription and watches `roots` instead
    ///
    /// A root that cannot be watched (missing, permission denied, unreachable
    /// network share) is logged and left unwatched. Returns the number of roots
    /// now being watched.
    pub fn subscribe<P: AsRef<Path>>(&mut self, roots: &[P]) -> usize {
        self.subscriptions.clear();

        for root in roots {
            let root = absolutize(root.as_ref());
            match self.watch_root(&root) {
                Ok(watcher) => {
                    debug!(root = %root.display(), "watching root");
                    self.subscriptions.push((root, watcher));
                }
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "root left unwatched");
                }
            }
        }

        info!(roots = self.subscriptions.len(), "watch subscriptions refreshed");
        self.subscriptions.len()
    }

    fn watch_root(&self, root: &Path) -> notify::Result<RecommendedWatcher> {
        let events = self.events.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for repo in created_repositories(&event) {
                    // The receiver is gone once the scheduler shuts down
                    let _ = events.send(WatchEvent::MarkerCreated(repo));
                }
            }
            Err(e) => debug!(error = %e, "watch error"),
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }

    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.subscriptions
            .iter()
            .map(|(root, _)| root.clone())
            .collect()
    }
}

/// Repository roots announced by a raw filesystem event
///
/// A marker directory counts when it is itself the created path, or when it
/// already sits inside a directory that was just created or moved in. The
/// second case covers `mkdir -p`, copies and unpacked archives, where the new
/// parent is not watched yet when its marker appears.
fn created_repositories(event: &Event) -> Vec<PathBuf> {
    let arrived = match event.kind {
        EventKind::Create(kind) => kind != CreateKind::File,
        EventKind::Modify(ModifyKind::Name(mode)) => {
            matches!(mode, RenameMode::To | RenameMode::Both | RenameMode::Any)
        }
        _ => false,
    };
    if !arrived {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            if path.file_name().is_some_and(|name| name == MARKER_DIR) {
                path.parent().map(Path::to_path_buf)
            } else if path.join(MARKER_DIR).is_dir() {
                Some(path.clone())
            } else {
                None
            }
        })
        .collect()
}

/// Applies one watch event to the cache, returning true when a repository was added
pub fn apply_event(event: WatchEvent, cache: &RepoCache, matcher: &IgnoreMatcher) -> bool {
    match event {
        WatchEvent::MarkerCreated(repo) => {
            if matcher.matches(&repo) {
                debug!(path = %repo.display(), "ignoring new repository");
                return false;
            }
            let added = cache.add(repo.clone());
            if added {
                info!(path = %repo.display(), "new repository detected");
            }
            added
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_apply_adds_unignored_repo() {
        let cache = RepoCache::new();
        let matcher = IgnoreMatcher::new(&["scratch"]);

        assert!(apply_event(
            WatchEvent::MarkerCreated(PathBuf::from("/work/new")),
            &cache,
            &matcher
        ));
        assert!(cache.contains(Path::new("/work/new")));
    }

    #[test]
    fn test_apply_skips_ignored_repo() {
        let cache = RepoCache::new();
        let matcher = IgnoreMatcher::new(&["scratch"]);

        assert!(!apply_event(
            WatchEvent::MarkerCreated(PathBuf::from("/work/scratch/new")),
            &cache,
            &matcher
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_apply_duplicate_is_noop() {
        let cache = RepoCache::new();
        cache.add(PathBuf::from("/work/Known"));
        let matcher = IgnoreMatcher::default();

        assert!(!apply_event(
            WatchEvent::MarkerCreated(PathBuf::from("/work/known")),
            &cache,
            &matcher
        ));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_only_marker_directory_creations_count() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        std::fs::create_dir_all(repo.join(MARKER_DIR)).unwrap();
        std::fs::write(repo.join("README"), "x").unwrap();

        let created = Event::new(EventKind::Create(CreateKind::Folder))
            .add_path(repo.join(MARKER_DIR));
        assert_eq!(created_repositories(&created), vec![repo.clone()]);

        let plain = temp.path().join("repo-less");
        std::fs::create_dir(&plain).unwrap();
        let plain_dir = Event::new(EventKind::Create(CreateKind::Folder)).add_path(plain);
        assert!(created_repositories(&plain_dir).is_empty());

        let modified =
            Event::new(EventKind::Modify(ModifyKind::Any)).add_path(repo.join(MARKER_DIR));
        assert!(created_repositories(&modified).is_empty());

        let file = Event::new(EventKind::Create(CreateKind::File)).add_path(repo.join("README"));
        assert!(created_repositories(&file).is_empty());
    }

    #[test]
    fn test_new_directory_already_holding_marker_counts() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("copied");
        std::fs::create_dir_all(repo.join(MARKER_DIR)).unwrap();

        let created = Event::new(EventKind::Create(CreateKind::Folder)).add_path(repo.clone());
        assert_eq!(created_repositories(&created), vec![repo.clone()]);

        let moved_in = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(repo.clone());
        assert_eq!(created_repositories(&moved_in), vec![repo.clone()]);

        let moved_out = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(repo);
        assert!(created_repositories(&moved_out).is_empty());
    }

    #[test]
    fn test_unwatchable_root_is_skipped() {
        let temp = TempDir::new().unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = LiveRepoWatcher::new(tx);

        let watched = watcher.subscribe(&[temp.path().join("missing"), temp.path().to_path_buf()]);
        assert_eq!(watched, 1);
        assert_eq!(watcher.watched_roots().len(), 1);
    }
}
