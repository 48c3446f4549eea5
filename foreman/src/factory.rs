use foreman_api::factory::{ThreadFactory, ThreadFactoryProvider};

/// Default thread-construction strategy: names threads
/// `<scope>-<pool>-<n>` so every pool's threads are recognizable in stack
/// dumps and profilers.
#[derive(Debug, Clone)]
pub struct DefaultThreadFactoryProvider {
    scope: String,
}

impl DefaultThreadFactoryProvider {
    pub fn new() -> Self {
        Self::scoped("foreman")
    }

    /// A provider whose threads carry the given scope, e.g. the name of the
    /// cache manager this provider serves.
    pub fn scoped(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }
}

impl Default for DefaultThreadFactoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadFactoryProvider for DefaultThreadFactoryProvider {
    fn thread_factory(&self, pool_name: &str) -> ThreadFactory {
        ThreadFactory::new(format!("{}-{}", self.scope, pool_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_prefix_carries_scope_and_pool_name() {
        let provider = DefaultThreadFactoryProvider::scoped("cache-manager-1");
        let factory = provider.thread_factory("shared-cached");
        assert_eq!(factory.prefix(), "cache-manager-1-shared-cached");
    }
}
