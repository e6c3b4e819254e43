//! Idempotent shutdown.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Running,
    InProgress,
    Done,
}

/// Runs a teardown exactly once, however many threads ask for it.
///
/// The first caller of `shutdown` runs the teardown. Callers arriving while
/// it runs block until it completes; later callers return immediately.
/// `wait` blocks until the teardown has completed.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    phase: Mutex<Phase>,
    changed: Condvar,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        ShutdownCoordinator::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        ShutdownCoordinator {
            phase: Mutex::new(Phase::Running),
            changed: Condvar::new(),
        }
    }

    /// Run `teardown` if no one has yet. Returns `true` for the caller that ran it.
    pub fn shutdown<F: FnOnce()>(&self, teardown: F) -> bool {
        {
            let mut phase = self.phase.lock();
            match *phase {
                Phase::Running => *phase = Phase::InProgress,
                Phase::InProgress => {
                    while *phase != Phase::Done {
                        self.changed.wait(&mut phase);
                    }
                    return false;
                }
                Phase::Done => return false,
            }
        }

        teardown();

        *self.phase.lock() = Phase::Done;
        self.changed.notify_all();
        true
    }

    /// Block until a teardown has completed.
    pub fn wait(&self) {
        let mut phase = self.phase.lock();
        while *phase != Phase::Done {
            self.changed.wait(&mut phase);
        }
    }

    /// Like `wait`, giving up after `timeout`. Returns `true` once shut down.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut phase = self.phase.lock();
        if *phase != Phase::Done {
            let _ = self
                .changed
                .wait_while_for(&mut phase, |phase| *phase != Phase::Done, timeout);
        }
        *phase == Phase::Done
    }

    pub fn is_shut_down(&self) -> bool {
        *self.phase.lock() == Phase::Done
    }
}
