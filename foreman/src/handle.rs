//! Executor handles wrapping the pool engine.
//!
//! A handle is what callers actually hold. Managed handles suppress
//! caller-issued lifecycle calls so one caller cannot tear down a pool other
//! callers depend on; unmanaged handles pass them through because the caller
//! is the pool's sole owner.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use foreman_api::error::SubmitError;
use foreman_api::executor::{Executor, ScheduledExecutor, ScheduledTask};
use foreman_api::task::{ListenerRef, Task};

use crate::pool::{ScheduledPool, ThreadPool};

/// Handle to a plain thread pool, managed or unmanaged.
#[derive(Debug)]
pub struct PoolExecutorHandle {
    pool: Arc<ThreadPool>,
    managed: bool,
}

impl PoolExecutorHandle {
    /// Shared-pool handle: lifecycle calls are ignored.
    pub(crate) fn managed(pool: Arc<ThreadPool>) -> Self {
        Self {
            pool,
            managed: true,
        }
    }

    /// Exclusive-pool handle: the caller owns the lifecycle.
    pub(crate) fn unmanaged(pool: Arc<ThreadPool>) -> Self {
        Self {
            pool,
            managed: false,
        }
    }
}

impl Executor for PoolExecutorHandle {
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        self.pool.submit(task, None)
    }

    fn submit_with_listener(&self, task: Task, listener: ListenerRef) -> Result<(), SubmitError> {
        self.pool.submit(task, Some(listener))
    }

    fn shutdown(&self) {
        if self.managed {
            debug!(pool = %self.pool.name(), "Ignoring shutdown on managed handle");
            return;
        }
        self.pool.shutdown();
    }

    fn shutdown_now(&self) -> usize {
        if self.managed {
            debug!(pool = %self.pool.name(), "Ignoring shutdown_now on managed handle");
            return 0;
        }
        self.pool.shutdown_now()
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        if self.managed {
            debug!(pool = %self.pool.name(), "Ignoring await_termination on managed handle");
            return false;
        }
        self.pool.await_termination(timeout)
    }

    fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    fn pool_id(&self) -> u64 {
        self.pool.pool_id()
    }
}

/// Handle to the shared scheduled pool. Always managed: no unmanaged
/// scheduled path exists, so every lifecycle call is a no-op.
#[derive(Debug)]
pub struct ScheduledExecutorHandle {
    pool: Arc<ScheduledPool>,
}

impl ScheduledExecutorHandle {
    pub(crate) fn new(pool: Arc<ScheduledPool>) -> Self {
        Self { pool }
    }
}

impl Executor for ScheduledExecutorHandle {
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        self.pool.submit(task, None)
    }

    fn submit_with_listener(&self, task: Task, listener: ListenerRef) -> Result<(), SubmitError> {
        self.pool.submit(task, Some(listener))
    }

    fn shutdown(&self) {
        debug!("Ignoring shutdown on managed scheduled handle");
    }

    fn shutdown_now(&self) -> usize {
        debug!("Ignoring shutdown_now on managed scheduled handle");
        0
    }

    fn await_termination(&self, _timeout: Duration) -> bool {
        false
    }

    fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    fn pool_id(&self) -> u64 {
        self.pool.pool_id()
    }
}

impl ScheduledExecutor for ScheduledExecutorHandle {
    fn schedule(&self, task: Task, delay: Duration) -> Result<ScheduledTask, SubmitError> {
        self.pool.schedule(task, delay)
    }

    fn schedule_at_fixed_rate(
        &self,
        task: Arc<dyn Fn() + Send + Sync>,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<ScheduledTask, SubmitError> {
        self.pool.schedule_at_fixed_rate(task, initial_delay, period)
    }
}
