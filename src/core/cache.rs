//! Shared set of known repository paths

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::discovery::path_key;

/// The set of repositories known between discovery cycles
///
/// Paths are keyed case-insensitively, so two spellings of the same directory
/// never coexist. Every operation takes the same lock; callers that go on to do
/// slow work must take a [`RepoCache::snapshot`] and release it first.
#[derive(Debug, Default)]
pub struct RepoCache {
    repos: Mutex<BTreeMap<String, PathBuf>>,
}

impl RepoCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, PathBuf>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.repos.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current paths, ordered case-insensitively
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock().values().cloned().collect()
    }

    /// Replaces the whole set, typically with the result of a full discovery
    pub fn replace<I>(&self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let fresh: BTreeMap<String, PathBuf> = paths
            .into_iter()
            .map(|path| (path_key(&path), path))
            .collect();
        *self.lock() = fresh;
    }

    /// Adds one repository, returning false when it was already known
    pub fn add(&self, path: PathBuf) -> bool {
        let mut guard = self.lock();
        let key = path_key(&path);
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, path);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(&path_key(path))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
