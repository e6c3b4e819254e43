//! Change debouncing.

use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};

use crate::batch::ChangeBatch;

/// Coalesces bursts of change events into batches.
///
/// A batch is flushed once no event has arrived for a full window; every
/// event restarts the window. Changes pending when the event source
/// disconnects are dropped, since disconnection means shutdown.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run until `events` disconnects, calling `flush` once per batch.
    pub fn run<F>(&self, events: &Receiver<PathBuf>, mut flush: F)
    where
        F: FnMut(ChangeBatch),
    {
        while let Ok(first) = events.recv() {
            let mut batch = ChangeBatch::new();
            batch.insert(first);
            loop {
                match events.recv_timeout(self.window) {
                    Ok(path) => {
                        batch.insert(path);
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::debug!(paths = batch.len(), "flushing change batch");
                        flush(batch);
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        tracing::debug!(paths = batch.len(), "dropping pending changes on shutdown");
                        return;
                    }
                }
            }
        }
    }

    /// Run on a dedicated thread.
    pub fn spawn<F>(self, events: Receiver<PathBuf>, flush: F) -> std::io::Result<JoinHandle<()>>
    where
        F: FnMut(ChangeBatch) + Send + 'static,
    {
        thread::Builder::new()
            .name("vista-debounce".to_string())
            .spawn(move || self.run(&events, flush))
    }
}
