use std::collections::HashMap;

use crate::config::PoolConfig;
use crate::task::TaskType;

/// Output of selection-policy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolType {
    /// Route onto the process-wide shared pool.
    Shared,
    /// Classified for exclusive handling.
    Exclusive,
}

/// Pure, stateless mapping from task classification to pool routing.
///
/// The registry may call this on every request, so implementations must be
/// cheap and deterministic. `None` for a task type is a configuration error
/// surfaced at the call site, never a silent default: callers must supply a
/// total mapping over the task-type domain they use.
pub trait ThreadPoolSelectionPolicy: Send + Sync {
    fn pool_type(&self, task_type: TaskType) -> Option<PoolType>;
}

/// Sizing for the process-wide shared pools.
///
/// Both values are read lazily, exactly once, at first construction of the
/// corresponding singleton. Implementations must be safe to query from
/// threads racing to trigger that construction and must return stable values
/// for the provider's lifetime; the registry never re-reads them.
pub trait SharedThreadPoolPolicy: Send + Sync {
    /// Configuration for the shared cached (elastic) pool.
    fn shared_cached_pool_config(&self) -> PoolConfig;

    /// Core worker count for the shared scheduled pool. Zero is invalid.
    fn scheduled_core_size(&self) -> usize;
}

/// Map-backed selection policy.
#[derive(Debug, Clone, Default)]
pub struct TaskTypeSelectionPolicy {
    routes: HashMap<TaskType, PoolType>,
}

impl TaskTypeSelectionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one route. Builder-style so wiring code reads as a table.
    pub fn route(mut self, task_type: TaskType, pool_type: PoolType) -> Self {
        self.routes.insert(task_type, pool_type);
        self
    }

    /// Policy mapping every task type onto the shared pool.
    pub fn all_shared() -> Self {
        let all = [
            TaskType::Normal,
            TaskType::Eviction,
            TaskType::Expiry,
            TaskType::WriteBehind,
            TaskType::Maintenance,
        ];
        let mut policy = Self::new();
        for task_type in all {
            policy.routes.insert(task_type, PoolType::Shared);
        }
        policy
    }
}

impl ThreadPoolSelectionPolicy for TaskTypeSelectionPolicy {
    fn pool_type(&self, task_type: TaskType) -> Option<PoolType> {
        self.routes.get(&task_type).copied()
    }
}

/// Shared-pool policy with fixed values decided at wiring time.
#[derive(Debug, Clone)]
pub struct StaticSharedPoolPolicy {
    pub cached_config: PoolConfig,
    pub scheduled_core_size: usize,
}

impl StaticSharedPoolPolicy {
    pub fn new(cached_config: PoolConfig, scheduled_core_size: usize) -> Self {
        Self {
            cached_config,
            scheduled_core_size,
        }
    }
}

impl Default for StaticSharedPoolPolicy {
    fn default() -> Self {
        Self {
            cached_config: PoolConfig::cached(),
            scheduled_core_size: num_cpus::get().clamp(1, 4),
        }
    }
}

impl SharedThreadPoolPolicy for StaticSharedPoolPolicy {
    fn shared_cached_pool_config(&self) -> PoolConfig {
        self.cached_config.clone()
    }

    fn scheduled_core_size(&self) -> usize {
        self.scheduled_core_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_task_type_yields_none() {
        let policy = TaskTypeSelectionPolicy::new().route(TaskType::Normal, PoolType::Shared);

        assert_eq!(policy.pool_type(TaskType::Normal), Some(PoolType::Shared));
        assert_eq!(policy.pool_type(TaskType::Eviction), None);
    }

    #[test]
    fn all_shared_covers_every_task_type() {
        let policy = TaskTypeSelectionPolicy::all_shared();
        for task_type in [
            TaskType::Normal,
            TaskType::Eviction,
            TaskType::Expiry,
            TaskType::WriteBehind,
            TaskType::Maintenance,
        ] {
            assert_eq!(policy.pool_type(task_type), Some(PoolType::Shared));
        }
    }

    #[test]
    fn default_shared_policy_is_sane() {
        let policy = StaticSharedPoolPolicy::default();
        assert!(policy.scheduled_core_size() >= 1);
        assert!(policy.shared_cached_pool_config().validate().is_ok());
    }
}
