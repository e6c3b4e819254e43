//! Serialized execution of reload work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::batch::ChangeBatch;

/// Work run on the executor thread.
pub trait BatchHandler: Send + 'static {
    fn handle(&mut self, batch: ChangeBatch);

    /// Called once on the executor thread after the queue is closed.
    fn finish(&mut self) {}
}

/// A single worker thread that owns a `BatchHandler`.
///
/// Batches run one at a time in submission order. The handler is never
/// touched by any other thread, so its state needs no locking.
pub struct SerialExecutor {
    sender: Sender<ChangeBatch>,
    cancelled: Arc<AtomicBool>,
    done: Receiver<()>,
    thread: JoinHandle<()>,
}

impl SerialExecutor {
    pub fn spawn<H: BatchHandler>(mut handler: H) -> std::io::Result<Self> {
        let (sender, queue) = unbounded::<ChangeBatch>();
        let (done_tx, done) = bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let thread = thread::Builder::new()
            .name("vista-reload".to_string())
            .spawn(move || {
                for batch in queue {
                    if flag.load(Ordering::SeqCst) {
                        tracing::debug!("worker cancelled, skipping queued batches");
                        break;
                    }
                    handler.handle(batch);
                }
                handler.finish();
                let _ = done_tx.send(());
            })?;

        Ok(SerialExecutor {
            sender,
            cancelled,
            done,
            thread,
        })
    }

    /// Queue a batch. Returns `false` once the executor is closed.
    pub fn submit(&self, batch: ChangeBatch) -> bool {
        self.sender.send(batch).is_ok()
    }

    /// A cloneable handle for submitting from another thread.
    ///
    /// The queue only closes once every submitter is dropped.
    pub fn submitter(&self) -> Sender<ChangeBatch> {
        self.sender.clone()
    }

    /// Close the queue and wait up to `timeout` for queued work to drain.
    ///
    /// Returns `true` if the worker finished in time. Otherwise the worker
    /// is cancelled (it stops after its current batch) and left detached.
    pub fn shutdown(self, timeout: Duration) -> bool {
        let SerialExecutor {
            sender,
            cancelled,
            done,
            thread,
        } = self;
        drop(sender);
        match done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if thread.join().is_err() {
                    tracing::error!("reload worker panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                cancelled.store(true, Ordering::SeqCst);
                tracing::warn!(?timeout, "reload worker did not drain in time; cancelling");
                false
            }
        }
    }
}

impl std::fmt::Debug for SerialExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialExecutor")
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use std::path::PathBuf;
    use std::thread::ThreadId;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct Log {
        handled: Vec<(String, ThreadId)>,
        finished: bool,
    }

    struct Recorder {
        log: Arc<Mutex<Log>>,
        delay: Duration,
    }

    impl BatchHandler for Recorder {
        fn handle(&mut self, batch: ChangeBatch) {
            thread::sleep(self.delay);
            let name = batch
                .paths()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(",");
            self.log.lock().handled.push((name, thread::current().id()));
        }

        fn finish(&mut self) {
            self.log.lock().finished = true;
        }
    }

    fn batch(name: &str) -> ChangeBatch {
        std::iter::once(PathBuf::from(name)).collect()
    }

    #[test]
    fn runs_batches_in_order_on_one_thread() {
        let log = Arc::new(Mutex::new(Log::default()));
        let executor = SerialExecutor::spawn(Recorder {
            log: Arc::clone(&log),
            delay: Duration::ZERO,
        })
        .unwrap();

        let submitter = executor.submitter();
        let producer = thread::spawn(move || {
            for i in 0..5 {
                submitter.send(batch(&format!("b{i}"))).unwrap();
            }
        });
        producer.join().unwrap();
        assert!(executor.shutdown(Duration::from_secs(5)));

        let log = log.lock();
        let names: Vec<_> = log.handled.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["b0", "b1", "b2", "b3", "b4"]);
        let first = log.handled[0].1;
        assert!(log.handled.iter().all(|(_, id)| *id == first));
        assert_ne!(first, thread::current().id());
        assert!(log.finished);
    }

    #[test]
    fn slow_worker_is_cancelled_after_timeout() {
        let log = Arc::new(Mutex::new(Log::default()));
        let executor = SerialExecutor::spawn(Recorder {
            log: Arc::clone(&log),
            delay: Duration::from_millis(200),
        })
        .unwrap();
        for i in 0..5 {
            assert!(executor.submit(batch(&format!("b{i}"))));
        }

        assert!(!executor.shutdown(Duration::from_millis(50)));

        // The in-flight batch completes, the rest are skipped.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !log.lock().finished && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        let log = log.lock();
        assert!(log.finished);
        assert!(log.handled.len() < 5);
    }
}
