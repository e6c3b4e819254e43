//! Patch-over-base resolution.

use std::io;
use std::path::{Path, PathBuf};

use crate::classpath::ClasspathLoader;
use crate::{Artifact, Origin, Resolver};

/// Resolver that consults a patch directory before the base classpath.
///
/// Lookups in the patch root are canonicalized and must stay inside the
/// root; anything that escapes (via `..` or a symlink) falls through to the
/// base entries as if the patch did not contain it.
#[derive(Clone, Debug)]
pub struct OverlayLoader {
    patch_root: PathBuf,
    base: ClasspathLoader,
}

impl OverlayLoader {
    /// Create an overlay. Fails if `patch_root` cannot be canonicalized.
    pub fn new(patch_root: &Path, base: Vec<PathBuf>) -> io::Result<Self> {
        Ok(OverlayLoader {
            patch_root: patch_root.canonicalize()?,
            base: ClasspathLoader::new(base),
        })
    }

    pub fn patch_root(&self) -> &Path {
        &self.patch_root
    }

    pub fn base(&self) -> &ClasspathLoader {
        &self.base
    }

    fn patch_lookup(&self, name: &str) -> Option<PathBuf> {
        if Path::new(name).is_absolute() {
            return None;
        }
        let canonical = self.patch_root.join(name).canonicalize().ok()?;
        if !canonical.starts_with(&self.patch_root) {
            tracing::debug!(name, "rejected patch lookup escaping the patch root");
            return None;
        }
        canonical.is_file().then_some(canonical)
    }
}

impl Resolver for OverlayLoader {
    fn resolve(&self, name: &str) -> Option<Artifact> {
        match self.patch_lookup(name) {
            Some(path) => Some(Artifact {
                path,
                origin: Origin::Patch,
            }),
            None => self.base.resolve(name),
        }
    }

    fn resolve_all(&self, name: &str) -> Vec<Artifact> {
        let mut found: Vec<Artifact> = self
            .patch_lookup(name)
            .map(|path| Artifact {
                path,
                origin: Origin::Patch,
            })
            .into_iter()
            .collect();
        found.extend(self.base.resolve_all(name));
        found
    }

    fn search_path(&self) -> Vec<PathBuf> {
        let mut path = Vec::with_capacity(self.base.entries().len() + 1);
        path.push(self.patch_root.clone());
        path.extend(self.base.entries().iter().cloned());
        path
    }
}
