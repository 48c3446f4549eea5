//! # Executor Registry
//!
//! The coordination core: resolves execution-resource requests to concrete
//! pool instances and owns the shared singletons' lifecycle.
//!
//! ## Key Concepts
//! - Lazy singletons: the shared cached pool and the shared scheduled pool
//!   are built on first demand, exactly once, under a per-slot mutex
//! - Policy resolution: every hinted request passes through the selection
//!   policy; an unmapped task type is an error, never a silent default
//! - Ownership split: shared pools are registry-owned until teardown,
//!   exclusive pools are never retained past the constructing call

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use foreman_api::config::{PoolConfig, ProviderConfig};
use foreman_api::error::ProviderError;
use foreman_api::executor::{Executor, ScheduledExecutor};
use foreman_api::factory::ThreadFactoryProvider;
use foreman_api::policy::{PoolType, SharedThreadPoolPolicy, ThreadPoolSelectionPolicy};
use foreman_api::provider::ExecutorServiceType;
use foreman_api::task::RequestContext;

use crate::handle::{PoolExecutorHandle, ScheduledExecutorHandle};
use crate::pool::{ScheduledPool, ThreadPool};

/// Bounded wait after a forced shutdown before giving up on a pool.
const FORCE_WAIT: Duration = Duration::from_secs(1);

/// Resolves executor requests and manages the shared singletons.
pub struct ExecutorRegistry {
    selection_policy: Arc<dyn ThreadPoolSelectionPolicy>,
    shared_policy: Arc<dyn SharedThreadPoolPolicy>,
    thread_factory: Arc<dyn ThreadFactoryProvider>,
    shutdown_grace: Duration,
    shared_cached: Mutex<Option<Arc<ThreadPool>>>,
    shared_scheduled: Mutex<Option<Arc<ScheduledPool>>>,
    torn_down: AtomicBool,
}

impl ExecutorRegistry {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            selection_policy: config.selection_policy.clone(),
            shared_policy: config.shared_policy.clone(),
            thread_factory: config.thread_factory.clone(),
            shutdown_grace: config.shutdown_grace,
            shared_cached: Mutex::new(None),
            shared_scheduled: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Returns a managed handle to the shared service of the given kind.
    ///
    /// Both policy classifications resolve to the shared singleton:
    /// exclusivity is only ever granted through an explicit [`PoolConfig`]
    /// request. The classification is still mandatory, so an unmapped task
    /// type fails here rather than falling through to a default pool.
    pub fn executor_service(
        &self,
        service_type: ExecutorServiceType,
        context: &RequestContext,
    ) -> Result<Arc<dyn Executor>, ProviderError> {
        self.ensure_live()?;
        let classification = self.resolve_classification(context)?;
        debug!(
            service = ?service_type,
            task_type = %context.task_type,
            classification = ?classification,
            component = context.component.as_deref(),
            "Shared executor requested"
        );

        match service_type {
            ExecutorServiceType::Cached => {
                let pool = self.shared_cached_pool()?;
                Ok(Arc::new(PoolExecutorHandle::managed(pool)))
            }
            ExecutorServiceType::Scheduled => {
                let pool = self.shared_scheduled_pool()?;
                Ok(Arc::new(ScheduledExecutorHandle::new(pool)))
            }
        }
    }

    /// Builds a brand-new pool strictly from `config` and hands full
    /// ownership to the caller. The registry keeps no reference: each call
    /// yields a distinct pool, even for equal configurations.
    pub fn exclusive_executor(
        &self,
        config: PoolConfig,
    ) -> Result<Arc<dyn Executor>, ProviderError> {
        self.ensure_live()?;
        config.validate()?;

        let factory = self.thread_factory.thread_factory("exclusive");
        let pool = Arc::new(ThreadPool::new("exclusive", config, factory));
        info!(pool_id = pool.pool_id(), "Exclusive pool constructed");
        Ok(Arc::new(PoolExecutorHandle::unmanaged(pool)))
    }

    /// Returns a managed handle to the shared scheduled pool.
    pub fn scheduled_executor_service(
        &self,
        context: &RequestContext,
    ) -> Result<Arc<dyn ScheduledExecutor>, ProviderError> {
        self.ensure_live()?;
        let classification = self.resolve_classification(context)?;
        debug!(
            task_type = %context.task_type,
            classification = ?classification,
            component = context.component.as_deref(),
            "Shared scheduled executor requested"
        );

        let pool = self.shared_scheduled_pool()?;
        Ok(Arc::new(ScheduledExecutorHandle::new(pool)))
    }

    /// Shuts down both shared singletons, if they were ever built: graceful
    /// drain bounded by the grace period, then forced discard. Idempotent;
    /// failures are aggregated into a single error.
    pub fn shutdown(&self) -> Result<(), ProviderError> {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let cached = self.shared_cached.lock().unwrap().take();
        let scheduled = self.shared_scheduled.lock().unwrap().take();
        let mut failures = Vec::new();

        if let Some(pool) = cached {
            pool.shutdown();
            if !pool.await_termination(self.shutdown_grace) {
                let discarded = pool.shutdown_now();
                warn!(
                    pool = "shared-cached",
                    discarded, "Grace period elapsed, forcing shutdown"
                );
                if !pool.await_termination(FORCE_WAIT) {
                    failures.push(format!(
                        "shared-cached pool did not terminate ({discarded} queued tasks discarded)"
                    ));
                }
            }
        }

        if let Some(pool) = scheduled {
            pool.shutdown();
            if !pool.await_termination(self.shutdown_grace) {
                let discarded = pool.shutdown_now();
                warn!(
                    pool = "shared-scheduled",
                    discarded, "Grace period elapsed, forcing shutdown"
                );
                if !pool.await_termination(FORCE_WAIT) {
                    failures.push(format!(
                        "shared-scheduled pool did not terminate ({discarded} queued tasks discarded)"
                    ));
                }
            }
        }

        if failures.is_empty() {
            info!("Executor registry torn down");
            Ok(())
        } else {
            Err(ProviderError::Teardown(failures.join("; ")))
        }
    }

    fn ensure_live(&self) -> Result<(), ProviderError> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(ProviderError::IllegalState("stopped"));
        }
        Ok(())
    }

    fn resolve_classification(
        &self,
        context: &RequestContext,
    ) -> Result<PoolType, ProviderError> {
        self.selection_policy
            .pool_type(context.task_type)
            .ok_or_else(|| {
                ProviderError::UnsupportedRequest(format!(
                    "no pool mapping for task type '{}'",
                    context.task_type
                ))
            })
    }

    /// Lazy, exactly-once construction of the shared cached pool. The slot
    /// mutex makes one concurrent first-caller the constructor and everyone
    /// else an observer; a failed construction leaves the slot empty so a
    /// later call may retry.
    fn shared_cached_pool(&self) -> Result<Arc<ThreadPool>, ProviderError> {
        let mut slot = self.shared_cached.lock().unwrap();
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }
        // Re-checked under the slot lock: teardown takes the same lock, so a
        // singleton can never be published after its slot was drained.
        self.ensure_live()?;

        let config = self.shared_policy.shared_cached_pool_config();
        config
            .validate()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        let factory = self.thread_factory.thread_factory("shared-cached");
        let pool = Arc::new(ThreadPool::new("shared-cached", config, factory));
        info!(pool_id = pool.pool_id(), "Shared cached pool constructed");
        *slot = Some(pool.clone());
        Ok(pool)
    }

    fn shared_scheduled_pool(&self) -> Result<Arc<ScheduledPool>, ProviderError> {
        let mut slot = self.shared_scheduled.lock().unwrap();
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }
        self.ensure_live()?;

        let core_size = self.shared_policy.scheduled_core_size();
        if core_size == 0 {
            return Err(ProviderError::Configuration(
                "scheduled pool core size must be nonzero".to_string(),
            ));
        }

        let worker_factory = self.thread_factory.thread_factory("shared-scheduled");
        let timer_factory = self.thread_factory.thread_factory("shared-scheduled-timer");
        let pool = ScheduledPool::new("shared-scheduled", core_size, worker_factory, timer_factory)
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to start scheduled pool timer: {e}"))
            })?;
        let pool = Arc::new(pool);
        info!(pool_id = pool.pool_id(), "Shared scheduled pool constructed");
        *slot = Some(pool.clone());
        Ok(pool)
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("torn_down", &self.torn_down.load(Ordering::Relaxed))
            .finish()
    }
}
