//! Filesystem watching.

use std::path::{Component, Path, PathBuf};

use crossbeam::channel::Sender;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Decides which changed paths are worth a reload.
#[derive(Clone, Debug, Default)]
pub struct WatchFilter {
    /// Extensions that count. Empty accepts every extension.
    pub extensions: Vec<String>,
    /// Paths whose descendants are ignored (e.g. the scratch directory).
    pub ignore_roots: Vec<PathBuf>,
    /// Path components that are ignored wherever they appear.
    pub ignore_dirs: Vec<String>,
}

impl WatchFilter {
    pub fn new(extensions: Vec<String>) -> Self {
        WatchFilter {
            extensions,
            ignore_roots: Vec::new(),
            ignore_dirs: vec![".git".to_string()],
        }
    }

    pub fn ignoring(mut self, root: PathBuf) -> Self {
        self.ignore_roots.push(root);
        self
    }

    pub fn should_watch(&self, path: &Path) -> bool {
        if !self.extensions.is_empty() {
            let matched = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| self.extensions.iter().any(|watched| watched == ext));
            if !matched {
                return false;
            }
        }
        if self.ignore_roots.iter().any(|root| path.starts_with(root)) {
            return false;
        }
        !path.components().any(|component| match component {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|name| self.ignore_dirs.iter().any(|ignored| ignored == name)),
            _ => false,
        })
    }
}

/// Non-recursive watch on one directory.
///
/// Relevant changed paths are sent to the channel given at construction.
/// Dropping the watcher stops the watch and disconnects that channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl FileWatcher {
    pub fn watch(
        dir: &Path,
        filter: WatchFilter,
        events: Sender<PathBuf>,
    ) -> Result<Self, notify::Error> {
        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if !is_change(&event.kind) {
                        return;
                    }
                    for path in event.paths {
                        if filter.should_watch(&path) {
                            tracing::trace!(path = %path.display(), "change detected");
                            // The receiver only disappears during shutdown.
                            let _ = events.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!("watch error: {e}"),
            },
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(dir = %dir.display(), "watching");
        Ok(FileWatcher {
            _watcher: watcher,
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("dir", &self.dir).finish()
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter() {
        let filter = WatchFilter::new(vec!["kt".to_string()]);
        assert!(filter.should_watch(Path::new("src/Card.kt")));
        assert!(!filter.should_watch(Path::new("src/Card.kt.swp")));
        assert!(!filter.should_watch(Path::new("src/Makefile")));
    }

    #[test]
    fn empty_extension_list_accepts_everything() {
        let filter = WatchFilter::new(Vec::new());
        assert!(filter.should_watch(Path::new("src/Makefile")));
    }

    #[test]
    fn ignored_roots_and_dirs() {
        let filter =
            WatchFilter::new(vec!["kt".to_string()]).ignoring(PathBuf::from("/tmp/vista-scratch-1"));
        assert!(!filter.should_watch(Path::new("/tmp/vista-scratch-1/patch/Card.kt")));
        assert!(!filter.should_watch(Path::new("repo/.git/Card.kt")));
        assert!(filter.should_watch(Path::new("/tmp/other/Card.kt")));
    }
}
