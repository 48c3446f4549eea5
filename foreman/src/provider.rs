//! # Provider Façade
//!
//! [`PooledExecutorProvider`] is the public entry point of the subsystem: a
//! service with an explicit start/stop lifecycle wrapping the
//! [`ExecutorRegistry`]. Starting wires the registry with its policy
//! collaborators but builds no pools; stopping delegates to the registry's
//! teardown. Acquisition outside the running window is an error.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use tracing::info;

use foreman_api::config::{PoolConfig, ProviderConfig, DEFAULT_SHUTDOWN_GRACE};
use foreman_api::error::ProviderError;
use foreman_api::executor::{Executor, ScheduledExecutor};
use foreman_api::policy::{StaticSharedPoolPolicy, TaskTypeSelectionPolicy};
use foreman_api::provider::{ExecutorProvider, ExecutorServiceType};
use foreman_api::task::RequestContext;

use crate::factory::DefaultThreadFactoryProvider;
use crate::registry::ExecutorRegistry;

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

fn state_name(state: u8) -> &'static str {
    match state {
        STATE_CREATED => "created",
        STATE_RUNNING => "running",
        _ => "stopped",
    }
}

/// The executor-provisioning service.
pub struct PooledExecutorProvider {
    config: ProviderConfig,
    state: AtomicU8,
    registry: RwLock<Option<Arc<ExecutorRegistry>>>,
}

impl PooledExecutorProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(STATE_CREATED),
            registry: RwLock::new(None),
        }
    }

    /// Provider wired with the default policies: every task type routed to
    /// the shared pool, cached-pool sizing, CPU-derived scheduled core size.
    pub fn with_defaults() -> Self {
        Self::new(ProviderConfig {
            selection_policy: Arc::new(TaskTypeSelectionPolicy::all_shared()),
            shared_policy: Arc::new(StaticSharedPoolPolicy::default()),
            thread_factory: Arc::new(DefaultThreadFactoryProvider::new()),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }

    fn registry(&self) -> Result<Arc<ExecutorRegistry>, ProviderError> {
        let state = self.state.load(Ordering::SeqCst);
        if state != STATE_RUNNING {
            return Err(ProviderError::IllegalState(state_name(state)));
        }
        self.registry
            .read()
            .unwrap()
            .as_ref()
            .cloned()
            .ok_or(ProviderError::IllegalState("stopped"))
    }
}

impl ExecutorProvider for PooledExecutorProvider {
    fn start(&self) -> Result<(), ProviderError> {
        match self.state.compare_exchange(
            STATE_CREATED,
            STATE_RUNNING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                *self.registry.write().unwrap() =
                    Some(Arc::new(ExecutorRegistry::new(&self.config)));
                info!("Executor provider started");
                Ok(())
            }
            Err(current) => Err(ProviderError::IllegalState(state_name(current))),
        }
    }

    fn stop(&self) -> Result<(), ProviderError> {
        let previous = self.state.swap(STATE_STOPPED, Ordering::SeqCst);
        if previous != STATE_RUNNING {
            // Never started, or already stopped: nothing to tear down.
            return Ok(());
        }

        let registry = self.registry.write().unwrap().take();
        match registry {
            Some(registry) => {
                let result = registry.shutdown();
                info!("Executor provider stopped");
                result
            }
            None => Ok(()),
        }
    }

    fn executor_service(
        &self,
        service_type: ExecutorServiceType,
        context: &RequestContext,
    ) -> Result<Arc<dyn Executor>, ProviderError> {
        self.registry()?.executor_service(service_type, context)
    }

    fn exclusive_executor(&self, config: PoolConfig) -> Result<Arc<dyn Executor>, ProviderError> {
        self.registry()?.exclusive_executor(config)
    }

    fn scheduled_executor_service(
        &self,
        context: &RequestContext,
    ) -> Result<Arc<dyn ScheduledExecutor>, ProviderError> {
        self.registry()?.scheduled_executor_service(context)
    }
}

impl std::fmt::Debug for PooledExecutorProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledExecutorProvider")
            .field("state", &state_name(self.state.load(Ordering::Relaxed)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_once_and_only_once() {
        let provider = PooledExecutorProvider::with_defaults();
        assert!(provider.start().is_ok());
        assert!(matches!(
            provider.start(),
            Err(ProviderError::IllegalState("running"))
        ));
        provider.stop().unwrap();
    }

    #[test]
    fn acquisition_before_start_is_illegal() {
        let provider = PooledExecutorProvider::with_defaults();
        let result = provider.executor_service(
            ExecutorServiceType::Cached,
            &RequestContext::new(foreman_api::task::TaskType::Normal),
        );
        assert!(matches!(
            result,
            Err(ProviderError::IllegalState("created"))
        ));
    }

    #[test]
    fn stop_without_start_is_a_noop() {
        let provider = PooledExecutorProvider::with_defaults();
        assert!(provider.stop().is_ok());
        assert!(provider.stop().is_ok());
    }
}
