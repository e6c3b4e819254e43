//! Debounced change batches.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The set of paths that changed within one debounce window.
///
/// A set: repeated events for the same file collapse into one entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    paths: BTreeSet<PathBuf>,
}

impl ChangeBatch {
    pub fn new() -> Self {
        ChangeBatch::default()
    }

    /// Add a path. Returns `false` if it was already pending.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Changed paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl FromIterator<PathBuf> for ChangeBatch {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        ChangeBatch {
            paths: iter.into_iter().collect(),
        }
    }
}
