//! Starting and stopping a preview session.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::unbounded;
use parking_lot::Mutex;

use crate::collaborators::Collaborators;
use crate::config::ReloadConfig;
use crate::debounce::Debouncer;
use crate::error::ReloadError;
use crate::orchestrator::ReloadOrchestrator;
use crate::render::RenderSink;
use crate::shutdown::ShutdownCoordinator;
use crate::watcher::{FileWatcher, WatchFilter};
use crate::worker::SerialExecutor;

/// Render the previewed file once and tear down.
///
/// Runs the same startup sequence as `start` (stale scratch purge, full
/// rebuild, render) without watching.
pub fn render_once<S>(
    config: ReloadConfig,
    collaborators: Collaborators,
    sink: S,
) -> Result<(), ReloadError>
where
    S: RenderSink + 'static,
{
    let mut orchestrator = ReloadOrchestrator::new(config, collaborators, Box::new(sink))?;
    orchestrator.initialize();
    orchestrator.teardown();
    Ok(())
}

/// Start watching: initialize, then re-render after every debounced batch.
///
/// The first render has been delivered to `sink` by the time this returns.
pub fn start<S>(
    config: ReloadConfig,
    collaborators: Collaborators,
    sink: S,
) -> Result<PreviewHandle, ReloadError>
where
    S: RenderSink + 'static,
{
    let drain_timeout = config.drain_timeout;
    let debounce = config.debounce;
    let watch_dir = config.watch_dir().to_path_buf();
    let extensions = config.watch_extensions.clone();

    let mut orchestrator = ReloadOrchestrator::new(config, collaborators, Box::new(sink))?;
    orchestrator.initialize();
    let scratch = orchestrator.session().scratch().path().to_path_buf();

    let executor = SerialExecutor::spawn(orchestrator).map_err(|source| ReloadError::Spawn {
        what: "reload worker",
        source,
    })?;
    let submitter = executor.submitter();

    let (events_tx, events_rx) = unbounded();
    let filter = WatchFilter::new(extensions).ignoring(scratch.clone());
    let watcher = match FileWatcher::watch(&watch_dir, filter, events_tx) {
        Ok(watcher) => watcher,
        Err(source) => {
            drop(submitter);
            executor.shutdown(drain_timeout);
            return Err(ReloadError::Watch {
                dir: watch_dir.display().to_string(),
                source,
            });
        }
    };

    let debouncer = Debouncer::new(debounce).spawn(events_rx, move |batch| {
        if submitter.send(batch).is_err() {
            tracing::debug!("reload worker closed; dropping batch");
        }
    });
    let debouncer = match debouncer {
        Ok(debouncer) => debouncer,
        Err(source) => {
            drop(watcher);
            executor.shutdown(drain_timeout);
            return Err(ReloadError::Spawn {
                what: "debounce",
                source,
            });
        }
    };

    tracing::info!(dir = %watch_dir.display(), "watching for changes");
    Ok(PreviewHandle {
        shared: Arc::new(Shared {
            coordinator: ShutdownCoordinator::new(),
            running: Mutex::new(Some(Running {
                watcher,
                debouncer,
                executor,
                scratch,
            })),
            drain_timeout,
        }),
    })
}

/// Handle to a running preview session.
///
/// Cloneable; `shutdown` may be called from any clone and any thread, any
/// number of times.
#[derive(Clone, Debug)]
pub struct PreviewHandle {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    coordinator: ShutdownCoordinator,
    running: Mutex<Option<Running>>,
    drain_timeout: Duration,
}

#[derive(Debug)]
struct Running {
    watcher: FileWatcher,
    debouncer: JoinHandle<()>,
    executor: SerialExecutor,
    scratch: PathBuf,
}

impl Running {
    fn stop(self, drain_timeout: Duration) {
        // Stopping the watcher disconnects the debouncer, which in turn
        // releases its handle on the worker queue.
        drop(self.watcher);
        if self.debouncer.join().is_err() {
            tracing::error!("debounce thread panicked");
        }
        // A cancelled worker still owns the scratch directory: it may be
        // rendering from it, and it deletes it once that render returns.
        if !self.executor.shutdown(drain_timeout) {
            tracing::warn!(
                dir = %self.scratch.display(),
                "scratch directory is removed when the in-flight render ends"
            );
        }
    }
}

impl PreviewHandle {
    /// Stop watching, drain the worker and delete the scratch directory.
    ///
    /// Returns `true` for the call that performed the teardown. Concurrent
    /// callers block until it has finished. If the worker misses the drain
    /// timeout this returns without waiting for it; the worker deletes the
    /// scratch directory after its current render.
    pub fn shutdown(&self) -> bool {
        self.shared.coordinator.shutdown(|| {
            tracing::info!("shutting down");
            if let Some(running) = self.shared.running.lock().take() {
                running.stop(self.shared.drain_timeout);
            }
        })
    }

    /// Block until some caller has completed `shutdown`.
    pub fn wait(&self) {
        self.shared.coordinator.wait();
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared.coordinator.wait_timeout(timeout)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.coordinator.is_shut_down()
    }
}
