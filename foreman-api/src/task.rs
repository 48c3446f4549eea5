use std::fmt;
use std::sync::Arc;

/// A unit of work submitted to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Classification of cache-runtime work, used as input to the selection
/// policy and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Ordinary cache operations (loader calls, refresh-ahead, etc.)
    Normal,
    /// Eviction sweeps triggered by capacity pressure.
    Eviction,
    /// Expiry reaping of timed-out entries.
    Expiry,
    /// Asynchronous write-behind flushes to the authority store.
    WriteBehind,
    /// Periodic store maintenance (compaction, statistics rollup).
    Maintenance,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Normal => "normal",
            TaskType::Eviction => "eviction",
            TaskType::Expiry => "expiry",
            TaskType::WriteBehind => "write-behind",
            TaskType::Maintenance => "maintenance",
        };
        f.write_str(name)
    }
}

/// Context accompanying a hinted executor request.
///
/// The registry reads the task type exactly once, for policy resolution, and
/// the component label only for the acquisition log line. Neither becomes
/// part of pool identity.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_type: TaskType,
    pub component: Option<String>,
}

impl RequestContext {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            component: None,
        }
    }

    pub fn for_component(task_type: TaskType, component: impl Into<String>) -> Self {
        Self {
            task_type,
            component: Some(component.into()),
        }
    }
}

/// Terminal state of one executed task.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The task ran to completion.
    Completed,
    /// The task panicked; the payload is the rendered panic message.
    Panicked(String),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

/// Optional completion side-channel for a submitted task.
///
/// Listeners are observed for notification only, never for control flow: a
/// panicking listener does not change the task's own outcome, and the pool
/// keeps running either way.
pub trait TaskListener: Send + Sync {
    fn on_complete(&self, outcome: &TaskOutcome);
}

/// Shared listener reference as carried alongside a task submission.
pub type ListenerRef = Arc<dyn TaskListener>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_display_names() {
        assert_eq!(TaskType::Normal.to_string(), "normal");
        assert_eq!(TaskType::WriteBehind.to_string(), "write-behind");
    }

    #[test]
    fn request_context_component_label() {
        let ctx = RequestContext::for_component(TaskType::Eviction, "on-heap-store");
        assert_eq!(ctx.task_type, TaskType::Eviction);
        assert_eq!(ctx.component.as_deref(), Some("on-heap-store"));

        let bare = RequestContext::new(TaskType::Normal);
        assert!(bare.component.is_none());
    }
}
