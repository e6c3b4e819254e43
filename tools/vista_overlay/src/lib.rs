//! Layered artifact resolution.
//!
//! A fast compile writes freshly built units into a scratch ("patch")
//! directory. Loading the previewed module must see those units first and
//! everything else from the cached classpath:
//!
//! ```text
//! resolve("app/Card.unit")
//!     │
//!     ├─► patch root   (canonicalized, must stay inside the root)
//!     │
//!     └─► base entries (classpath order, first match wins)
//! ```
//!
//! Both loaders are read-only views; nothing here writes to disk.

mod classpath;
mod overlay;

pub use classpath::ClasspathLoader;
pub use overlay::OverlayLoader;

use std::path::PathBuf;

/// Where a resolved artifact came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Patch,
    /// Index into the base entry list.
    Base(usize),
}

/// A resolved artifact on disk.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub path: PathBuf,
    pub origin: Origin,
}

/// Name-to-artifact resolution shared by the overlay and plain loaders.
pub trait Resolver: Send + Sync {
    /// First artifact named `name` (a relative path).
    fn resolve(&self, name: &str) -> Option<Artifact>;

    /// Every artifact named `name`, in precedence order, without deduplication.
    fn resolve_all(&self, name: &str) -> Vec<Artifact>;

    /// Ordered roots this resolver searches.
    fn search_path(&self) -> Vec<PathBuf>;

    /// Resolve a dotted unit name (`app.ui.Card`) with the given extension.
    fn resolve_unit(&self, unit: &str, extension: &str) -> Option<Artifact> {
        self.resolve(&unit_path(unit, extension))
    }
}

/// `app.ui.Card` + `unit` → `app/ui/Card.unit`.
pub fn unit_path(unit: &str, extension: &str) -> String {
    let mut path = unit.replace('.', "/");
    if !extension.is_empty() {
        path.push('.');
        path.push_str(extension);
    }
    path
}
