//! Plain classpath resolution (no patch layer).

use std::path::{Path, PathBuf};

use crate::{Artifact, Origin, Resolver};

/// Resolves names against an ordered list of classpath entries.
///
/// Directory entries are searched by relative path; a name that resolves
/// outside its entry (via `..` or a symlink) does not match. File entries
/// (packaged artifacts) match a name equal to their own file name.
#[derive(Clone, Debug, Default)]
pub struct ClasspathLoader {
    entries: Vec<PathBuf>,
}

impl ClasspathLoader {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        ClasspathLoader { entries }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    fn lookup(&self, entry: &Path, name: &str) -> Option<PathBuf> {
        if Path::new(name).is_absolute() {
            return None;
        }
        if entry.is_dir() {
            let root = entry.canonicalize().ok()?;
            let candidate = root.join(name).canonicalize().ok()?;
            if !candidate.starts_with(&root) {
                tracing::debug!(name, entry = %entry.display(), "rejected lookup escaping a classpath entry");
                return None;
            }
            return candidate.is_file().then_some(candidate);
        }
        let file_name = entry.file_name()?;
        (entry.is_file() && file_name == name).then(|| entry.to_path_buf())
    }
}

impl Resolver for ClasspathLoader {
    fn resolve(&self, name: &str) -> Option<Artifact> {
        self.entries.iter().enumerate().find_map(|(index, entry)| {
            self.lookup(entry, name).map(|path| Artifact {
                path,
                origin: Origin::Base(index),
            })
        })
    }

    fn resolve_all(&self, name: &str) -> Vec<Artifact> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                self.lookup(entry, name).map(|path| Artifact {
                    path,
                    origin: Origin::Base(index),
                })
            })
            .collect()
    }

    fn search_path(&self) -> Vec<PathBuf> {
        self.entries.clone()
    }
}
