use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::SubmitError;
use crate::task::{ListenerRef, Task};

/// A handle to a thread pool accepting one-shot tasks.
///
/// Whether the lifecycle methods take effect depends on how the handle was
/// obtained: managed (shared) handles suppress them, unmanaged (exclusive)
/// handles pass them through to the underlying pool.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Submits a task for asynchronous execution.
    fn submit(&self, task: Task) -> Result<(), SubmitError>;

    /// Submits a task with a completion listener. The listener is notified
    /// after the task finishes, whatever the outcome.
    fn submit_with_listener(&self, task: Task, listener: ListenerRef) -> Result<(), SubmitError>;

    /// Initiates a graceful shutdown: no new submissions, queued work drains.
    /// No-op on managed handles.
    fn shutdown(&self);

    /// Shuts down immediately, discarding queued tasks. Returns the number
    /// of tasks discarded. No-op on managed handles (returns 0).
    fn shutdown_now(&self) -> usize;

    /// Waits up to `timeout` for all workers to exit after a shutdown.
    /// Returns `true` once the pool is fully terminated. Managed handles
    /// return `false` immediately without waiting.
    fn await_termination(&self, timeout: Duration) -> bool;

    /// Whether the underlying pool has been shut down. Observational, so
    /// managed handles report this truthfully.
    fn is_shutdown(&self) -> bool;

    /// Stable diagnostic identity of the underlying pool. Two handles backed
    /// by the same pool report the same id; distinct pools never share one.
    fn pool_id(&self) -> u64;
}

/// A handle to a pool that additionally runs delayed and periodic tasks.
pub trait ScheduledExecutor: Executor {
    /// Runs `task` once after `delay`.
    fn schedule(&self, task: Task, delay: Duration) -> Result<ScheduledTask, SubmitError>;

    /// Runs `task` repeatedly at a fixed rate: first after `initial_delay`,
    /// then every `period` measured from the previous scheduled fire time.
    fn schedule_at_fixed_rate(
        &self,
        task: Arc<dyn Fn() + Send + Sync>,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<ScheduledTask, SubmitError>;
}

/// Cancellation handle for a scheduled task.
///
/// Cancellation is checked at fire time: a cancelled one-shot never runs, a
/// cancelled periodic task is not re-armed. A firing already handed to a
/// worker is not interrupted.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    cancelled: Arc<AtomicBool>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for ScheduledTask {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_visible_through_clones() {
        let handle = ScheduledTask::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert!(clone.is_cancelled());
    }
}
