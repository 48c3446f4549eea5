use std::sync::Arc;

use crate::config::PoolConfig;
use crate::error::ProviderError;
use crate::executor::{Executor, ScheduledExecutor};
use crate::task::RequestContext;

/// Kind of shared service addressed by a hinted request, orthogonal to the
/// shared/exclusive split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorServiceType {
    /// The elastic cached pool for one-shot tasks.
    Cached,
    /// The scheduled pool; also accepts immediate one-shot tasks.
    Scheduled,
}

/// The executor-provisioning service.
///
/// A provider is wired once with its policy collaborators, started, handed
/// out as the process-wide source of execution resources, and stopped when
/// the owning runtime shuts down. Acquisition before `start` or after `stop`
/// fails with [`ProviderError::IllegalState`].
pub trait ExecutorProvider: Send + Sync {
    /// Transitions the provider into its running state. Performs no eager
    /// pool construction; shared pools stay lazy.
    fn start(&self) -> Result<(), ProviderError>;

    /// Stops the provider, tearing down every shared pool it owns.
    /// Idempotent: a second call, or a stop with no pool ever built, is a
    /// no-op.
    fn stop(&self) -> Result<(), ProviderError>;

    /// Returns a managed handle to the shared service of the given kind,
    /// after resolving `context` through the selection policy.
    ///
    /// The handle's lifecycle calls are suppressed; only the provider's own
    /// `stop` retires the underlying pool. Repeated calls for the same kind
    /// are backed by the same pool instance.
    fn executor_service(
        &self,
        service_type: ExecutorServiceType,
        context: &RequestContext,
    ) -> Result<Arc<dyn Executor>, ProviderError>;

    /// Builds a brand-new exclusive pool from `config` and returns an
    /// unmanaged handle. The caller fully owns the pool's lifecycle and must
    /// shut it down explicitly; the provider retains no reference.
    fn exclusive_executor(&self, config: PoolConfig) -> Result<Arc<dyn Executor>, ProviderError>;

    /// Returns a managed handle to the shared scheduled pool.
    fn scheduled_executor_service(
        &self,
        context: &RequestContext,
    ) -> Result<Arc<dyn ScheduledExecutor>, ProviderError>;
}
