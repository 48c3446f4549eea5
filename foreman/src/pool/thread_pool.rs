use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use foreman_api::config::{PoolConfig, QueueSpec};
use foreman_api::error::SubmitError;
use foreman_api::factory::ThreadFactory;
use foreman_api::task::{ListenerRef, Task, TaskOutcome};

/// Process-wide pool identity counter.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A task queued for execution, with its optional completion listener.
struct Envelope {
    task: Task,
    listener: Option<ListenerRef>,
}

/// Point-in-time view of a pool's state.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Live worker threads, core and transient together.
    pub workers: usize,

    /// Tasks waiting in the queue.
    pub queued: usize,

    /// Tasks run to a terminal outcome since construction.
    pub completed: u64,

    /// Whether shutdown has been initiated.
    pub is_shutdown: bool,
}

/// State shared between the pool front-end and its worker threads.
struct Shared {
    name: String,
    id: u64,
    core_pool_size: usize,
    keep_alive: Duration,
    rx: flume::Receiver<Envelope>,
    live_workers: AtomicUsize,
    idle_workers: AtomicUsize,
    completed: AtomicU64,
    shutdown: AtomicBool,
    termination_lock: Mutex<()>,
    termination_cv: Condvar,
}

/// An elastic OS-thread pool with `core`/`maximum` sizing.
///
/// Workers up to the core size are kept alive for the pool's lifetime;
/// workers above it are transient and retire after `keep_alive` of idleness.
/// The task queue is a flume channel shaped by the config's [`QueueSpec`]: a
/// saturated bounded queue first tries to grow the pool toward its maximum,
/// then rejects the submission.
///
/// # Thread Safety
/// - Worker bookkeeping through atomics; the sender side behind a mutex so
///   shutdown can close the queue exactly once
/// - Termination observed through a condvar signalled by the last worker
///
/// # Worker Behavior
/// 1. Waits on the queue (core workers block, transient workers use a
///    keep-alive timeout)
/// 2. Runs the task under `catch_unwind`; a panic is logged, never fatal
/// 3. Notifies the task's listener, itself isolated from listener panics
/// 4. Exits when the queue is closed and drained, or on idle expiry
pub struct ThreadPool {
    shared: Arc<Shared>,
    tx: Mutex<Option<flume::Sender<Envelope>>>,
    maximum_threads: usize,
    queue_capacity: Option<usize>,
    factory: ThreadFactory,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.shared.name)
            .field("id", &self.shared.id)
            .field("workers", &self.shared.live_workers.load(Ordering::Relaxed))
            .field("is_shutdown", &self.shared.shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

impl ThreadPool {
    /// Builds a pool from an already-validated config. No workers are
    /// started until the first submission.
    pub fn new(name: impl Into<String>, config: PoolConfig, factory: ThreadFactory) -> Self {
        let name = name.into();
        let (tx, rx) = match config.queue {
            QueueSpec::Bounded(capacity) => flume::bounded(capacity),
            QueueSpec::Unbounded => flume::unbounded(),
        };
        let queue_capacity = match config.queue {
            QueueSpec::Bounded(capacity) => Some(capacity),
            QueueSpec::Unbounded => None,
        };

        let shared = Arc::new(Shared {
            name: name.clone(),
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            core_pool_size: config.core_pool_size,
            keep_alive: config.keep_alive,
            rx,
            live_workers: AtomicUsize::new(0),
            idle_workers: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            termination_lock: Mutex::new(()),
            termination_cv: Condvar::new(),
        });

        debug!(pool = %name, id = shared.id, "Thread pool created");

        Self {
            shared,
            tx: Mutex::new(Some(tx)),
            maximum_threads: config.maximum_threads,
            queue_capacity,
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn pool_id(&self) -> u64 {
        self.shared.id
    }

    /// Submits a task, growing the worker set as the sizing policy allows.
    pub fn submit(&self, task: Task, listener: Option<ListenerRef>) -> Result<(), SubmitError> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(SubmitError::Shutdown);
        }

        let envelope = Envelope { task, listener };
        let outcome = {
            let guard = self.tx.lock().unwrap();
            let tx = guard.as_ref().ok_or(SubmitError::Shutdown)?;
            tx.try_send(envelope)
        };

        match outcome {
            Ok(()) => {
                self.ensure_worker_coverage();
                Ok(())
            }
            Err(flume::TrySendError::Full(envelope)) => {
                // Queue saturated: hand the task straight to a fresh worker
                // if the pool may still grow, otherwise reject.
                match self.try_spawn_worker(false, Some(envelope)) {
                    Ok(()) => Ok(()),
                    Err(_) => Err(SubmitError::Rejected {
                        capacity: self.queue_capacity.unwrap_or(0),
                    }),
                }
            }
            Err(flume::TrySendError::Disconnected(_)) => Err(SubmitError::Shutdown),
        }
    }

    /// Spawns workers so the freshly queued task will actually be picked up:
    /// fill toward core first, then add a transient worker if nobody is
    /// idle.
    fn ensure_worker_coverage(&self) {
        let live = self.shared.live_workers.load(Ordering::SeqCst);
        if live < self.shared.core_pool_size {
            let _ = self.try_spawn_worker(true, None);
        } else if self.shared.idle_workers.load(Ordering::SeqCst) == 0 {
            let _ = self.try_spawn_worker(false, None);
        }
    }

    /// Reserves a worker slot and spawns the thread through the factory.
    /// `initial` is run by the new worker before it joins the queue loop.
    fn try_spawn_worker(&self, core: bool, initial: Option<Envelope>) -> Result<(), ()> {
        let limit = if core {
            self.shared.core_pool_size
        } else {
            self.maximum_threads
        };

        loop {
            let current = self.shared.live_workers.load(Ordering::SeqCst);
            if current >= limit {
                return Err(());
            }
            if self
                .shared
                .live_workers
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        let shared = self.shared.clone();
        match self.factory.spawn(move || worker_loop(shared, core, initial)) {
            Ok(_handle) => Ok(()),
            Err(e) => {
                self.release_worker_slot();
                error!(pool = %self.shared.name, error = %e, "Failed to spawn worker thread");
                Err(())
            }
        }
    }

    fn release_worker_slot(&self) {
        let remaining = self.shared.live_workers.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 {
            let _guard = self.shared.termination_lock.lock().unwrap();
            self.shared.termination_cv.notify_all();
        }
    }

    /// Initiates graceful shutdown: the queue is closed, queued work drains,
    /// workers exit once the queue is empty.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.tx.lock().unwrap() = None;
        info!(pool = %self.shared.name, "Pool shutdown initiated");

        // Queued work with no worker left to drain it would be stranded.
        if !self.shared.rx.is_empty() && self.shared.live_workers.load(Ordering::SeqCst) == 0 {
            let _ = self.try_spawn_worker(false, None);
        }
    }

    /// Shuts down immediately, discarding queued tasks. In-flight tasks run
    /// to completion. Returns the number of discarded tasks.
    pub fn shutdown_now(&self) -> usize {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        *self.tx.lock().unwrap() = None;

        let mut discarded = 0;
        while self.shared.rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            warn!(pool = %self.shared.name, discarded, "Discarded queued tasks");
        }
        discarded
    }

    /// Waits up to `timeout` for every worker to exit. Returns `true` once
    /// the pool is fully terminated.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.shared.termination_lock.lock().unwrap();
        while self.shared.live_workers.load(Ordering::SeqCst) > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (g, _) = self
                .shared
                .termination_cv
                .wait_timeout(guard, deadline - now)
                .unwrap();
            guard = g;
        }
        true
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            workers: self.shared.live_workers.load(Ordering::Relaxed),
            queued: self.shared.rx.len(),
            completed: self.shared.completed.load(Ordering::Relaxed),
            is_shutdown: self.is_shutdown(),
        }
    }
}

/// Worker thread body. Core workers block on the queue for the pool's
/// lifetime; transient workers retire after `keep_alive` of idleness.
fn worker_loop(shared: Arc<Shared>, core: bool, initial: Option<Envelope>) {
    if let Some(envelope) = initial {
        run_task(&shared, envelope);
    }

    loop {
        shared.idle_workers.fetch_add(1, Ordering::SeqCst);
        let received = if core {
            shared
                .rx
                .recv()
                .map_err(|_| flume::RecvTimeoutError::Disconnected)
        } else {
            shared.rx.recv_timeout(shared.keep_alive)
        };
        shared.idle_workers.fetch_sub(1, Ordering::SeqCst);

        match received {
            Ok(envelope) => run_task(&shared, envelope),
            Err(flume::RecvTimeoutError::Timeout) => {
                // Keep-alive expired. Don't retire with work still queued;
                // the submitter may have counted on this worker.
                match shared.rx.try_recv() {
                    Ok(envelope) => run_task(&shared, envelope),
                    Err(_) => {
                        debug!(pool = %shared.name, "Transient worker retiring after keep-alive");
                        break;
                    }
                }
            }
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    let remaining = shared.live_workers.fetch_sub(1, Ordering::SeqCst) - 1;
    if remaining == 0 {
        let _guard = shared.termination_lock.lock().unwrap();
        shared.termination_cv.notify_all();
    }
}

/// Runs one task to a terminal outcome and notifies its listener. Neither a
/// task panic nor a listener panic escapes the worker.
fn run_task(shared: &Shared, envelope: Envelope) {
    let Envelope { task, listener } = envelope;

    let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(()) => TaskOutcome::Completed,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(pool = %shared.name, panic = %message, "Task panicked");
            TaskOutcome::Panicked(message)
        }
    };
    shared.completed.fetch_add(1, Ordering::Relaxed);

    if let Some(listener) = listener {
        let notified = panic::catch_unwind(AssertUnwindSafe(|| listener.on_complete(&outcome)));
        if notified.is_err() {
            warn!(pool = %shared.name, "Task listener panicked, ignoring");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn factory() -> ThreadFactory {
        ThreadFactory::new("test-pool")
    }

    #[test]
    fn runs_submitted_tasks() {
        let pool = ThreadPool::new("t", PoolConfig::fixed(2), factory());
        let (tx, rx) = mpsc::channel();

        for i in 0..4 {
            let tx = tx.clone();
            pool.submit(Box::new(move || tx.send(i).unwrap()), None)
                .unwrap();
        }

        let mut seen: Vec<i32> = (0..4)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn panicking_task_does_not_kill_the_pool() {
        let pool = ThreadPool::new("t", PoolConfig::fixed(1), factory());
        let (tx, rx) = mpsc::channel();

        pool.submit(Box::new(|| panic!("boom")), None).unwrap();
        pool.submit(Box::new(move || tx.send(()).unwrap()), None)
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(pool.metrics().completed >= 2);
    }

    #[test]
    fn submit_after_shutdown_is_refused() {
        let pool = ThreadPool::new("t", PoolConfig::fixed(1), factory());
        pool.shutdown();
        let result = pool.submit(Box::new(|| {}), None);
        assert_eq!(result, Err(SubmitError::Shutdown));
    }

    #[test]
    fn graceful_shutdown_drains_queued_work() {
        let pool = ThreadPool::new("t", PoolConfig::fixed(1), factory());
        let (tx, rx) = mpsc::channel();

        for _ in 0..8 {
            let tx = tx.clone();
            pool.submit(Box::new(move || tx.send(()).unwrap()), None)
                .unwrap();
        }
        pool.shutdown();

        for _ in 0..8 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        assert!(pool.await_termination(Duration::from_secs(5)));
    }
}
