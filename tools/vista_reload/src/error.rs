//! Errors that stop a preview session from starting.
//!
//! Everything after startup (compile failures, build failures, load
//! failures) is reported through the render sink instead.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("failed to prepare scratch directory: {0}")]
    Scratch(#[source] io::Error),
    #[error("failed to watch {dir}: {source}")]
    Watch {
        dir: String,
        #[source]
        source: notify::Error,
    },
    #[error("failed to start {what} thread: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: io::Error,
    },
}
