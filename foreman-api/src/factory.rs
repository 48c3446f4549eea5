use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::trace;

/// Produces a platform-appropriate thread-construction strategy for a
/// logical pool name.
///
/// Naming conventions and stack sizing are platform decisions owned by the
/// implementation; the provider only guarantees that every pool it builds,
/// shared or exclusive, resolves its threads through the same factory so
/// diagnostic thread names stay consistent.
pub trait ThreadFactoryProvider: Send + Sync {
    fn thread_factory(&self, pool_name: &str) -> ThreadFactory;
}

/// Concrete thread-construction strategy: a name prefix, a running counter,
/// and an optional stack size.
#[derive(Debug)]
pub struct ThreadFactory {
    prefix: String,
    counter: AtomicUsize,
    stack_size: Option<usize>,
}

impl ThreadFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicUsize::new(0),
            stack_size: None,
        }
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Spawns a thread named `<prefix>-<n>` running `f`.
    pub fn spawn<F>(&self, f: F) -> io::Result<thread::JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.prefix, id);
        trace!(thread = %name, "Spawning pool thread");
        let mut builder = thread::Builder::new().name(name);
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder.spawn(f)
    }
}

/// Shared factory-provider reference as consumed by the registry.
pub type FactoryProviderRef = Arc<dyn ThreadFactoryProvider>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn spawned_threads_get_sequential_names() {
        let factory = ThreadFactory::new("test-pool");
        let (tx, rx) = mpsc::channel();

        for _ in 0..2 {
            let tx = tx.clone();
            factory
                .spawn(move || {
                    tx.send(thread::current().name().unwrap().to_string())
                        .unwrap();
                })
                .unwrap()
                .join()
                .unwrap();
        }

        let mut names: Vec<String> = vec![rx.recv().unwrap(), rx.recv().unwrap()];
        names.sort();
        assert_eq!(names, vec!["test-pool-0", "test-pool-1"]);
    }
}
