//! Incremental reload pipeline.
//!
//! Watches the previewed file's directory, debounces bursts of changes into
//! batches, and re-renders every preview function after each batch:
//!
//! ```text
//! FileWatcher ──► Debouncer ──► SerialExecutor ──► ReloadOrchestrator
//!  (notify thread)  (timer thread)   (one worker)      │
//!                                                      ├─► fast compile ──► OverlayLoader ──┐
//!                                                      │         │ failure                  ├─► render
//!                                                      │         ▼                          │
//!                                                      └─► full rebuild ──► ClasspathLoader ┘
//! ```
//!
//! # Single-writer discipline
//!
//! All mutable orchestrator state (`ReloadSession`: cached target, cached
//! classpath, scratch directory) is owned by the one worker thread behind
//! `SerialExecutor`. The watcher and debouncer only send messages; nothing
//! in the session is behind a lock.
//!
//! # Shutdown
//!
//! `PreviewHandle::shutdown` may be called from a signal handler and the
//! main thread at the same time. `ShutdownCoordinator` lets the first caller
//! tear down (stop watcher, drain worker with a timeout, delete scratch) and
//! makes every other caller wait for it to finish.

mod batch;
mod collaborators;
mod config;
mod debounce;
mod error;
mod handle;
mod orchestrator;
mod render;
mod scratch;
mod session;
mod shutdown;
mod watcher;
mod worker;

pub use batch::ChangeBatch;
pub use collaborators::{
    BuildError, BuildSystem, Collaborators, CompileOutcome, Compiler, Discovery, LoadError,
    ModuleLoader, TargetId,
};
pub use config::{ReloadConfig, DEFAULT_DEBOUNCE, DEFAULT_DRAIN_TIMEOUT, DEFAULT_SCRATCH_PREFIX};
pub use debounce::Debouncer;
pub use error::ReloadError;
pub use handle::{render_once, start, PreviewHandle};
pub use orchestrator::{ReloadOrchestrator, State};
pub use render::{
    FailureStage, FunctionReport, RenderEvent, RenderPath, RenderReport, RenderSink, Renderer,
};
pub use scratch::{purge_stale, ScratchDir};
pub use session::ReloadSession;
pub use shutdown::ShutdownCoordinator;
pub use watcher::{FileWatcher, WatchFilter};
pub use worker::{BatchHandler, SerialExecutor};
