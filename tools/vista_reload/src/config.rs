//! Reload pipeline configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vista_invoke::InvokeConfig;

/// Default quiet period before a batch of changes is flushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Default bound on draining the worker during shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Prefix of per-process scratch directories.
pub const DEFAULT_SCRATCH_PREFIX: &str = "vista-scratch";

/// Configuration for one preview session.
#[derive(Clone, Debug)]
pub struct ReloadConfig {
    /// The previewed source file.
    pub file: PathBuf,
    /// Project root handed to the build system.
    pub root: PathBuf,
    /// Quiet period after the last change before a batch is flushed.
    pub debounce: Duration,
    /// How long shutdown waits for in-flight work.
    pub drain_timeout: Duration,
    /// Directory holding per-process scratch directories.
    pub scratch_parent: PathBuf,
    /// Scratch directories are named `<prefix>-<pid>`.
    pub scratch_prefix: String,
    /// Extensions that trigger a reload. Empty means every file.
    pub watch_extensions: Vec<String>,
    /// Render functions on a scoped thread pool.
    pub parallel: bool,
    /// Only render functions whose name contains this string.
    pub filter: Option<String>,
    pub invoke: InvokeConfig,
}

impl ReloadConfig {
    /// Defaults for previewing `file` inside `root`.
    ///
    /// Only changes to files sharing `file`'s extension trigger a reload.
    pub fn new(file: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let watch_extensions = file
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| vec![ext.to_string()])
            .unwrap_or_default();
        ReloadConfig {
            file,
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            scratch_parent: std::env::temp_dir(),
            scratch_prefix: DEFAULT_SCRATCH_PREFIX.to_string(),
            watch_extensions,
            parallel: false,
            filter: None,
            invoke: InvokeConfig::default(),
        }
    }

    /// Directory whose changes are watched: the previewed file's parent.
    pub fn watch_dir(&self) -> &Path {
        match self.file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Whether `name` passes the function filter.
    pub fn selects(&self, name: &str) -> bool {
        self.filter
            .as_deref()
            .map_or(true, |filter| name.contains(filter))
    }
}
