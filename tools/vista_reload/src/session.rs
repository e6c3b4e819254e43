//! Mutable state of one preview session.

use std::path::PathBuf;

use crate::collaborators::TargetId;
use crate::scratch::ScratchDir;

/// Cached build state plus the scratch directory.
///
/// Owned by the orchestrator and therefore only ever touched on the
/// reload worker thread.
#[derive(Debug)]
pub struct ReloadSession {
    target: Option<TargetId>,
    classpath: Option<Vec<PathBuf>>,
    scratch: ScratchDir,
    torn_down: bool,
}

impl ReloadSession {
    pub fn new(scratch: ScratchDir) -> Self {
        ReloadSession {
            target: None,
            classpath: None,
            scratch,
            torn_down: false,
        }
    }

    pub fn target(&self) -> Option<&TargetId> {
        self.target.as_ref()
    }

    pub fn classpath(&self) -> Option<&[PathBuf]> {
        self.classpath.as_deref()
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Remember the result of a successful full build.
    pub fn cache(&mut self, target: TargetId, classpath: Vec<PathBuf>) {
        self.target = Some(target);
        self.classpath = Some(classpath);
    }

    /// Forget the cached target and classpath before a full rebuild.
    pub fn invalidate(&mut self) {
        self.target = None;
        self.classpath = None;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Delete the scratch directory. Only the first call does anything.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.invalidate();
        if let Err(e) = self.scratch.remove() {
            tracing::warn!(dir = %self.scratch.path().display(), "failed to delete scratch directory: {e}");
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn cache_and_invalidate() {
        let parent = tempdir().unwrap();
        let mut session = ReloadSession::new(ScratchDir::prepare(parent.path(), "t").unwrap());
        assert!(session.classpath().is_none());

        session.cache(TargetId("//app:lib".to_string()), vec![PathBuf::from("out/app")]);
        assert_eq!(session.target().map(ToString::to_string).as_deref(), Some("//app:lib"));
        assert_eq!(session.classpath().map(<[PathBuf]>::len), Some(1));

        session.invalidate();
        assert!(session.target().is_none());
        assert!(session.classpath().is_none());
    }

    #[test]
    fn teardown_is_idempotent() {
        let parent = tempdir().unwrap();
        let mut session = ReloadSession::new(ScratchDir::prepare(parent.path(), "t").unwrap());
        let dir = session.scratch().path().to_path_buf();
        assert!(dir.exists());
        session.teardown();
        session.teardown();
        assert!(session.is_torn_down());
        assert!(!dir.exists());
    }
}
