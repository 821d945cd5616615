//! Lightweight textual ignore patterns for repository paths
//!
//! A pattern is matched case-insensitively against the whole path string. A single
//! leading and/or trailing `*` selects the kind of test; there is no general globbing.

use std::path::Path;

const WILDCARD: char = '*';

/// How a single pattern is applied to a path
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    Contains(String),
    EndsWith(String),
    StartsWith(String),
}

impl PatternKind {
    /// Parses a raw pattern, returning `None` for blank patterns or patterns
    /// that are nothing but wildcard markers
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let leading = raw.starts_with(WILDCARD);
        let trailing = raw.len() > 1 && raw.ends_with(WILDCARD);

        let mut core = raw;
        if leading {
            core = &core[WILDCARD.len_utf8()..];
        }
        if trailing {
            core = &core[..core.len() - WILDCARD.len_utf8()];
        }
        if core.is_empty() {
            return None;
        }

        let core = core.to_lowercase();
        Some(match (leading, trailing) {
            (true, false) => PatternKind::EndsWith(core),
            (false, true) => PatternKind::StartsWith(core),
            _ => PatternKind::Contains(core),
        })
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            PatternKind::Contains(core) => haystack.contains(core.as_str()),
            PatternKind::EndsWith(core) => haystack.ends_with(core.as_str()),
            PatternKind::StartsWith(core) => haystack.starts_with(core.as_str()),
        }
    }

    /// Whether a match on a directory implies a match on everything below it
    fn covers_descendants(&self) -> bool {
        !matches!(self, PatternKind::EndsWith(_))
    }
}

/// Compiled set of ignore patterns
///
/// Patterns are parsed once so the discovery walk does not re-lowercase them for
/// every directory it visits.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<PatternKind>,
}

impl IgnoreMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .filter_map(|p| PatternKind::parse(p.as_ref()))
                .collect(),
        }
    }

    /// Returns true when any pattern matches the path
    pub fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let haystack = path.to_string_lossy().to_lowercase();
        self.patterns.iter().any(|p| p.is_match(&haystack))
    }

    /// Returns true when every path below `dir` is guaranteed to be ignored too,
    /// so a walker may skip the whole subtree
    pub fn prunes(&self, dir: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let haystack = dir.to_string_lossy().to_lowercase();
        self.patterns
            .iter()
            .filter(|p| p.covers_descendants())
            .any(|p| p.is_match(&haystack))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// One-shot form of [`IgnoreMatcher::matches`]
pub fn matches<S: AsRef<str>>(path: &Path, patterns: &[S]) -> bool {
    IgnoreMatcher::new(patterns).matches(path)
}
