// Integration tests for executor handle behavior: saturation rejection,
// completion listeners, and listener fault isolation.

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use foreman_api::{
    ExecutorProvider, PoolConfig, QueueSpec, SubmitError, TaskListener, TaskOutcome,
};

mod test_helpers;
use test_helpers::{started_provider, WAIT};

/// Listener recording every outcome it observes.
struct RecordingListener {
    outcomes: Mutex<Vec<TaskOutcome>>,
    notify: Mutex<mpsc::Sender<()>>,
}

impl RecordingListener {
    fn new(notify: mpsc::Sender<()>) -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            notify: Mutex::new(notify),
        }
    }
}

impl TaskListener for RecordingListener {
    fn on_complete(&self, outcome: &TaskOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
        let _ = self.notify.lock().unwrap().send(());
    }
}

#[test]
fn saturated_bounded_queue_rejects() {
    let provider = started_provider();
    let handle = provider
        .exclusive_executor(PoolConfig {
            core_pool_size: 1,
            maximum_threads: 1,
            keep_alive: Duration::ZERO,
            queue: QueueSpec::Bounded(1),
        })
        .unwrap();

    // Occupy the single worker until released.
    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let (running_tx, running_rx) = mpsc::channel();
    handle
        .submit(Box::new(move || {
            running_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
        }))
        .unwrap();
    running_rx.recv_timeout(WAIT).unwrap();

    // One task fits in the queue; the next must be rejected.
    handle.submit(Box::new(|| {})).unwrap();
    let rejected = handle.submit(Box::new(|| {}));
    assert_eq!(rejected, Err(SubmitError::Rejected { capacity: 1 }));

    gate_tx.send(()).unwrap();
    handle.shutdown();
    assert!(handle.await_termination(WAIT));
    provider.stop().unwrap();
}

#[test]
fn listener_observes_completion_and_panic_outcomes() {
    let provider = started_provider();
    let handle = provider.exclusive_executor(PoolConfig::fixed(1)).unwrap();

    let (notify_tx, notify_rx) = mpsc::channel();
    let listener = Arc::new(RecordingListener::new(notify_tx));

    handle
        .submit_with_listener(Box::new(|| {}), listener.clone())
        .unwrap();
    notify_rx.recv_timeout(WAIT).unwrap();

    handle
        .submit_with_listener(Box::new(|| panic!("task blew up")), listener.clone())
        .unwrap();
    notify_rx.recv_timeout(WAIT).unwrap();

    let outcomes = listener.outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_completed());
    match &outcomes[1] {
        TaskOutcome::Panicked(message) => assert!(message.contains("task blew up")),
        other => panic!("expected panic outcome, got {other:?}"),
    }
    drop(outcomes);

    handle.shutdown();
    provider.stop().unwrap();
}

#[test]
fn panicking_listener_does_not_disturb_the_pool() {
    struct ExplodingListener;

    impl TaskListener for ExplodingListener {
        fn on_complete(&self, _outcome: &TaskOutcome) {
            panic!("listener failure");
        }
    }

    let provider = started_provider();
    let handle = provider.exclusive_executor(PoolConfig::fixed(1)).unwrap();

    handle
        .submit_with_listener(Box::new(|| {}), Arc::new(ExplodingListener))
        .unwrap();

    // The worker that ran the exploding listener must still serve tasks.
    let (tx, rx) = mpsc::channel();
    handle
        .submit(Box::new(move || tx.send(()).unwrap()))
        .unwrap();
    rx.recv_timeout(WAIT).unwrap();

    handle.shutdown();
    assert!(handle.await_termination(WAIT));
    provider.stop().unwrap();
}
