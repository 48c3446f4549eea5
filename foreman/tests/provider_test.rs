// Integration tests for the provider façade: lifecycle gating, teardown
// idempotence, and the end-to-end shared-pool scenario.

use std::sync::{mpsc, Arc, Barrier};
use std::thread;

use anyhow::Result;
use foreman::PooledExecutorProvider;
use foreman_api::{
    ExecutorProvider, ExecutorServiceType, PoolConfig, ProviderError, RequestContext,
    StaticSharedPoolPolicy, TaskType, TaskTypeSelectionPolicy,
};

mod test_helpers;
use test_helpers::{provider_config, started_provider, WAIT};

#[test]
fn acquisition_outside_running_window_fails() {
    let provider = PooledExecutorProvider::new(provider_config(
        TaskTypeSelectionPolicy::all_shared(),
        StaticSharedPoolPolicy::new(PoolConfig::cached(), 2),
    ));
    let context = RequestContext::new(TaskType::Normal);

    assert!(matches!(
        provider.executor_service(ExecutorServiceType::Cached, &context),
        Err(ProviderError::IllegalState("created"))
    ));

    provider.start().unwrap();
    assert!(provider
        .executor_service(ExecutorServiceType::Cached, &context)
        .is_ok());

    provider.stop().unwrap();
    assert!(matches!(
        provider.executor_service(ExecutorServiceType::Cached, &context),
        Err(ProviderError::IllegalState("stopped"))
    ));
    assert!(matches!(
        provider.exclusive_executor(PoolConfig::fixed(1)),
        Err(ProviderError::IllegalState("stopped"))
    ));
    assert!(matches!(
        provider.scheduled_executor_service(&context),
        Err(ProviderError::IllegalState("stopped"))
    ));
}

#[test]
fn stop_is_idempotent() {
    let provider = started_provider();
    // Touch the shared pool so teardown has something to do.
    provider
        .executor_service(
            ExecutorServiceType::Cached,
            &RequestContext::new(TaskType::Normal),
        )
        .unwrap();

    provider.stop().unwrap();
    provider.stop().unwrap();
}

#[test]
fn stop_with_no_singleton_ever_built_is_a_noop() {
    let provider = started_provider();
    provider.stop().unwrap();
    provider.stop().unwrap();
}

#[test]
fn end_to_end_shared_executor_scenario() -> Result<()> {
    let provider = Arc::new(PooledExecutorProvider::new(provider_config(
        TaskTypeSelectionPolicy::all_shared(),
        StaticSharedPoolPolicy::new(PoolConfig::cached(), 2),
    )));
    provider.start()?;

    // Ten threads race the shared accessor; all must observe one pool.
    let barrier = Arc::new(Barrier::new(10));
    let acquirers: Vec<_> = (0..10)
        .map(|_| {
            let provider = provider.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                provider
                    .executor_service(
                        ExecutorServiceType::Cached,
                        &RequestContext::new(TaskType::Normal),
                    )
                    .unwrap()
            })
        })
        .collect();

    let handles: Vec<_> = acquirers.into_iter().map(|h| h.join().unwrap()).collect();
    let first_id = handles[0].pool_id();
    assert!(handles.iter().all(|h| h.pool_id() == first_id));

    // Ten short tasks, one per handle; all must complete.
    let (tx, rx) = mpsc::channel();
    for handle in &handles {
        let tx = tx.clone();
        handle.submit(Box::new(move || tx.send(()).unwrap()))?;
    }
    for _ in 0..10 {
        rx.recv_timeout(WAIT)?;
    }

    provider.stop()?;
    assert!(matches!(
        provider.executor_service(
            ExecutorServiceType::Cached,
            &RequestContext::new(TaskType::Normal)
        ),
        Err(ProviderError::IllegalState("stopped"))
    ));
    Ok(())
}

#[test]
fn stop_drains_queued_shared_work_within_grace() {
    let provider = started_provider();
    let handle = provider
        .executor_service(
            ExecutorServiceType::Cached,
            &RequestContext::new(TaskType::WriteBehind),
        )
        .unwrap();

    let (tx, rx) = mpsc::channel();
    for _ in 0..16 {
        let tx = tx.clone();
        handle
            .submit(Box::new(move || {
                thread::sleep(std::time::Duration::from_millis(5));
                tx.send(()).unwrap();
            }))
            .unwrap();
    }

    provider.stop().unwrap();
    // Graceful teardown lets the queued tasks finish.
    for _ in 0..16 {
        rx.recv_timeout(WAIT).unwrap();
    }
}
