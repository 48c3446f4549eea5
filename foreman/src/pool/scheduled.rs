use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use foreman_api::config::PoolConfig;
use foreman_api::error::SubmitError;
use foreman_api::executor::ScheduledTask;
use foreman_api::factory::ThreadFactory;
use foreman_api::task::{ListenerRef, Task};

use super::thread_pool::{PoolMetrics, ThreadPool};

/// What a scheduled entry runs when it fires.
enum EntryKind {
    /// One-shot task, consumed at fire time.
    Once(Task),
    /// Fixed-rate task, re-armed at `deadline + period` after each fire.
    FixedRate {
        run: Arc<dyn Fn() + Send + Sync>,
        period: Duration,
    },
}

/// Heap entry ordered by deadline; `seq` breaks ties so equal deadlines fire
/// in submission order.
struct ScheduledEntry {
    deadline: Instant,
    seq: u64,
    kind: EntryKind,
    handle: ScheduledTask,
}

impl PartialEq for ScheduledEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for ScheduledEntry {}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap; invert so the earliest deadline wins.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A fixed-core scheduled executor layered on a [`ThreadPool`].
///
/// A single timer thread owns the delay queue: new entries arrive on a
/// command channel, the timer sleeps until the earliest deadline, and due
/// entries are handed to the inner pool for execution. Immediate submissions
/// bypass the timer entirely.
///
/// Shutdown closes the command channel first (the timer drains and exits,
/// dropping not-yet-due entries), then shuts the inner pool down.
pub struct ScheduledPool {
    pool: Arc<ThreadPool>,
    cmd_tx: Mutex<Option<flume::Sender<ScheduledEntry>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    seq: AtomicU64,
}

impl std::fmt::Debug for ScheduledPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledPool")
            .field("pool", &self.pool)
            .finish()
    }
}

impl ScheduledPool {
    /// Builds a scheduled pool with `core_size` workers. The timer thread is
    /// spawned eagerly (it is the pool's clock), workers stay lazy.
    pub fn new(
        name: impl Into<String>,
        core_size: usize,
        worker_factory: ThreadFactory,
        timer_factory: ThreadFactory,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let pool = Arc::new(ThreadPool::new(
            name.clone(),
            PoolConfig::fixed(core_size),
            worker_factory,
        ));
        let (cmd_tx, cmd_rx) = flume::unbounded();

        let timer_pool = pool.clone();
        let timer_name = name.clone();
        let timer = timer_factory.spawn(move || timer_loop(cmd_rx, timer_pool, timer_name))?;

        info!(pool = %name, core_size, "Scheduled pool created");

        Ok(Self {
            pool,
            cmd_tx: Mutex::new(Some(cmd_tx)),
            timer: Mutex::new(Some(timer)),
            seq: AtomicU64::new(0),
        })
    }

    pub fn pool_id(&self) -> u64 {
        self.pool.pool_id()
    }

    /// Immediate execution on the inner pool, no timer involvement.
    pub fn submit(&self, task: Task, listener: Option<ListenerRef>) -> Result<(), SubmitError> {
        self.pool.submit(task, listener)
    }

    /// Runs `task` once after `delay`.
    pub fn schedule(&self, task: Task, delay: Duration) -> Result<ScheduledTask, SubmitError> {
        self.enqueue_entry(Instant::now() + delay, EntryKind::Once(task))
    }

    /// Runs `task` repeatedly: first after `initial_delay`, then every
    /// `period` measured from the previous scheduled fire time.
    pub fn schedule_at_fixed_rate(
        &self,
        task: Arc<dyn Fn() + Send + Sync>,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<ScheduledTask, SubmitError> {
        self.enqueue_entry(
            Instant::now() + initial_delay,
            EntryKind::FixedRate { run: task, period },
        )
    }

    fn enqueue_entry(&self, deadline: Instant, kind: EntryKind) -> Result<ScheduledTask, SubmitError> {
        let guard = self.cmd_tx.lock().unwrap();
        let tx = guard.as_ref().ok_or(SubmitError::Shutdown)?;
        let handle = ScheduledTask::new();
        let entry = ScheduledEntry {
            deadline,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            kind,
            handle: handle.clone(),
        };
        tx.send(entry).map_err(|_| SubmitError::Shutdown)?;
        Ok(handle)
    }

    /// Graceful shutdown: the timer exits (pending delayed entries are
    /// dropped), queued immediate work drains, workers then retire.
    pub fn shutdown(&self) {
        *self.cmd_tx.lock().unwrap() = None;
        self.pool.shutdown();
    }

    /// Immediate shutdown. Returns the number of queued (already-due) tasks
    /// discarded from the inner pool.
    pub fn shutdown_now(&self) -> usize {
        *self.cmd_tx.lock().unwrap() = None;
        self.pool.shutdown_now()
    }

    /// Waits for the workers and the timer thread to exit.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        if !self.pool.await_termination(timeout) {
            return false;
        }
        // The timer exits promptly once the command channel closes.
        if let Some(handle) = self.timer.lock().unwrap().take() {
            let _ = handle.join();
        }
        true
    }

    pub fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.pool.metrics()
    }
}

/// Timer thread body: waits until the earliest deadline, fires due entries
/// onto the worker pool, and re-arms fixed-rate entries.
fn timer_loop(cmd_rx: flume::Receiver<ScheduledEntry>, pool: Arc<ThreadPool>, name: String) {
    let mut heap: BinaryHeap<ScheduledEntry> = BinaryHeap::new();

    loop {
        let now = Instant::now();
        while heap.peek().is_some_and(|entry| entry.deadline <= now) {
            let entry = heap.pop().unwrap();
            if entry.handle.is_cancelled() {
                continue;
            }
            match entry.kind {
                EntryKind::Once(task) => {
                    if let Err(e) = pool.submit(task, None) {
                        debug!(pool = %name, error = %e, "Dropping due task");
                    }
                }
                EntryKind::FixedRate { run, period } => {
                    let fire = run.clone();
                    match pool.submit(Box::new(move || fire()), None) {
                        Ok(()) => heap.push(ScheduledEntry {
                            deadline: entry.deadline + period,
                            seq: entry.seq,
                            kind: EntryKind::FixedRate { run, period },
                            handle: entry.handle,
                        }),
                        Err(e) => {
                            debug!(pool = %name, error = %e, "Disarming periodic task");
                        }
                    }
                }
            }
        }

        let received = match heap.peek() {
            Some(entry) => {
                let wait = entry.deadline.saturating_duration_since(Instant::now());
                cmd_rx.recv_timeout(wait)
            }
            None => cmd_rx
                .recv()
                .map_err(|_| flume::RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(entry) => heap.push(entry),
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(pool = %name, pending = heap.len(), "Timer thread exiting");
}
