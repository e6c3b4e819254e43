//! Per-process scratch directories.
//!
//! Each preview process compiles into `<parent>/<prefix>-<pid>`. Directories
//! left behind by processes that no longer exist are removed at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Scratch directory owned by the current process.
#[derive(Clone, Debug)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Purge stale directories and create a fresh one for this process.
    pub fn prepare(parent: &Path, prefix: &str) -> io::Result<Self> {
        Self::prepare_for(parent, prefix, std::process::id())
    }

    pub(crate) fn prepare_for(parent: &Path, prefix: &str, pid: u32) -> io::Result<Self> {
        fs::create_dir_all(parent)?;
        for removed in purge_stale(parent, prefix, pid) {
            tracing::info!(dir = %removed.display(), "removed stale scratch directory");
        }
        let root = parent.join(format!("{prefix}-{pid}"));
        if root.exists() {
            // Leftover from an earlier process that had our pid.
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(ScratchDir { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Output directory for fast compiles.
    pub fn patch_dir(&self) -> io::Result<PathBuf> {
        self.subdir("patch")
    }

    /// Output directory for the warm-up compile.
    pub fn warmup_dir(&self) -> io::Result<PathBuf> {
        self.subdir("warmup")
    }

    fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Delete the directory and everything in it. Missing is not an error.
    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Remove `<prefix>-<pid>` directories under `parent` whose process is gone.
///
/// `current_pid`'s own directory is left alone. Returns what was removed.
pub fn purge_stale(parent: &Path, prefix: &str, current_pid: u32) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(parent) else {
        return Vec::new();
    };
    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|name| owner_pid(name, prefix)) else {
            continue;
        };
        if pid == current_pid || process_alive(pid) {
            continue;
        }
        let path = entry.path();
        match fs::remove_dir_all(&path) {
            Ok(()) => removed.push(path),
            Err(e) => tracing::warn!(dir = %path.display(), "failed to remove stale scratch: {e}"),
        }
    }
    removed
}

fn owner_pid(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?.strip_prefix('-')?.parse().ok()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without a cheap liveness check, never delete another process's scratch.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
