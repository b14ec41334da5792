//! Deferred work for the thread that owns game state
//!
//! Any thread may enqueue. Only the owning thread drains, and each drain runs
//! a snapshot of the queue so work enqueued while draining waits for the next
//! tick.

use ap_core::{ApError, Result};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use tracing::{error, warn};

/// Single-use action run against the game context `C`
pub type DeferredTask<C> = Box<dyn FnOnce(&mut C) -> Result<()> + Send>;

/// Outcome of one [`MainThreadDispatcher::drain`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks that ran to completion
    pub executed: usize,
    /// Tasks that returned an error or panicked
    pub failed: usize,
}

/// FIFO queue of tasks bound to a single owner thread
pub struct MainThreadDispatcher<C> {
    queue: Mutex<VecDeque<DeferredTask<C>>>,
    owner: OnceLock<ThreadId>,
}

impl<C> Default for MainThreadDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> MainThreadDispatcher<C> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            owner: OnceLock::new(),
        }
    }

    /// Claim the calling thread as owner. The first `drain` does this
    /// implicitly; calling it at startup makes a stray drain fail fast.
    pub fn bind_to_current_thread(&self) {
        self.assert_owner();
    }

    /// Queue a task; never blocks beyond the queue lock
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce(&mut C) -> Result<()> + Send + 'static,
    {
        self.lock().push_back(Box::new(task));
    }

    /// Queue an already boxed task
    pub fn enqueue_boxed(&self, task: DeferredTask<C>) {
        self.lock().push_back(task);
    }

    /// Number of tasks waiting for the next drain
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run every task queued before this call, in enqueue order
    ///
    /// # Panics
    ///
    /// Panics if called from a thread other than the owner.
    pub fn drain(&self, ctx: &mut C) -> DrainReport {
        self.assert_owner();

        let batch = std::mem::take(&mut *self.lock());
        let mut report = DrainReport::default();

        for task in batch {
            match catch_unwind(AssertUnwindSafe(|| task(ctx))) {
                Ok(Ok(())) => report.executed += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!("Deferred task failed: {}", e);
                }
                Err(payload) => {
                    report.failed += 1;
                    let err = ApError::TaskExecution(panic_message(payload.as_ref()));
                    error!("Deferred task panicked: {}", err);
                }
            }
        }

        report
    }

    fn assert_owner(&self) {
        let current = thread::current().id();
        let owner = *self.owner.get_or_init(|| current);
        assert_eq!(
            owner, current,
            "main-thread tasks drained from a thread that does not own game state"
        );
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DeferredTask<C>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
