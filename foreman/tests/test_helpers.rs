// Shared helpers for foreman integration tests.

use std::sync::Arc;
use std::time::Duration;

use foreman::{DefaultThreadFactoryProvider, PooledExecutorProvider};
use foreman_api::{
    ExecutorProvider, PoolConfig, ProviderConfig, SharedThreadPoolPolicy, StaticSharedPoolPolicy,
    TaskTypeSelectionPolicy, ThreadPoolSelectionPolicy,
};

/// Generous wait used wherever a test blocks on task completion.
pub const WAIT: Duration = Duration::from_secs(5);

pub fn provider_config(
    selection: impl ThreadPoolSelectionPolicy + 'static,
    shared: impl SharedThreadPoolPolicy + 'static,
) -> ProviderConfig {
    ProviderConfig {
        selection_policy: Arc::new(selection),
        shared_policy: Arc::new(shared),
        thread_factory: Arc::new(DefaultThreadFactoryProvider::scoped("test")),
        shutdown_grace: Duration::from_secs(2),
    }
}

/// A started provider with total routing and small shared pools.
pub fn started_provider() -> PooledExecutorProvider {
    let provider = PooledExecutorProvider::new(provider_config(
        TaskTypeSelectionPolicy::all_shared(),
        StaticSharedPoolPolicy::new(PoolConfig::cached(), 2),
    ));
    provider.start().expect("provider should start");
    provider
}
