use std::sync::Arc;
use std::time::Duration;

use crate::error::ProviderError;
use crate::factory::ThreadFactoryProvider;
use crate::policy::{SharedThreadPoolPolicy, ThreadPoolSelectionPolicy};

/// Default keep-alive for transient workers of a cached pool.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Default grace period the registry waits for in-flight tasks at teardown
/// before forcing cancellation.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Shape of a pool's task queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSpec {
    /// Queue holding at most the given number of waiting tasks. Saturation
    /// surfaces to the submitter as a rejection.
    Bounded(usize),
    /// Queue growing without limit; submissions never get rejected.
    Unbounded,
}

/// Immutable description of how to build one thread pool.
///
/// Created by a caller (or loaded from configuration) immediately before
/// requesting an exclusive pool; the registry validates it, consumes it for
/// construction, and retains nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Workers kept alive even when idle.
    pub core_pool_size: usize,

    /// Upper bound on live workers, core and transient together.
    pub maximum_threads: usize,

    /// Idle time after which a transient worker (above core size) retires.
    pub keep_alive: Duration,

    /// Task queue shape.
    pub queue: QueueSpec,
}

impl PoolConfig {
    /// Fixed-size pool: `size` core workers, unbounded queue.
    pub fn fixed(size: usize) -> Self {
        Self {
            core_pool_size: size,
            maximum_threads: size,
            keep_alive: Duration::ZERO,
            queue: QueueSpec::Unbounded,
        }
    }

    /// Elastic cached pool: no core workers, effectively unbounded growth,
    /// transient workers retiring after the default keep-alive.
    pub fn cached() -> Self {
        Self {
            core_pool_size: 0,
            maximum_threads: usize::MAX,
            keep_alive: DEFAULT_KEEP_ALIVE,
            queue: QueueSpec::Unbounded,
        }
    }

    /// Checks the config invariants. Construction from an inconsistent
    /// config must fail here rather than silently clamp.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.maximum_threads == 0 {
            return Err(ProviderError::InvalidConfiguration(
                "maximum_threads must be at least 1".to_string(),
            ));
        }
        if self.maximum_threads < self.core_pool_size {
            return Err(ProviderError::InvalidConfiguration(format!(
                "maximum_threads ({}) is less than core_pool_size ({})",
                self.maximum_threads, self.core_pool_size
            )));
        }
        if let QueueSpec::Bounded(0) = self.queue {
            return Err(ProviderError::InvalidConfiguration(
                "bounded queue capacity must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Wiring for the executor provider: the policy collaborators, the thread
/// factory, and the teardown grace period.
///
/// Produced by an external configuration loader; the provider performs its
/// own validation at first use rather than trusting the loader.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Routes task classifications to shared or exclusive handling.
    pub selection_policy: Arc<dyn ThreadPoolSelectionPolicy>,

    /// Sizes the process-wide shared pools.
    pub shared_policy: Arc<dyn SharedThreadPoolPolicy>,

    /// Produces the thread-construction strategy for every pool.
    pub thread_factory: Arc<dyn ThreadFactoryProvider>,

    /// Bounded wait for in-flight tasks during teardown, before forcing.
    pub shutdown_grace: Duration,
}
