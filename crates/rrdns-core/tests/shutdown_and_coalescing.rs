//! Covers P6 (coalesced signal triggers at most one extra pass) and deterministic shutdown.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{node, spec, zone, FakeClusterObserver, FakeDnsProvider, FakeZoneResolver};
use rrdns_core::engine::{EngineConfig, EngineEvent};
use rrdns_core::status::shared_status;
use rrdns_core::ReconciliationEngine;
use tokio::sync::oneshot;
use tokio::time::timeout;

fn fast_config() -> EngineConfig {
    EngineConfig {
        sync_interval: Duration::from_secs(3600),
        min_pass_interval: Duration::ZERO,
        zone_concurrency: 4,
    }
}

#[tokio::test]
async fn burst_of_signals_yields_at_most_one_extra_pass() {
    let observer = Arc::new(FakeClusterObserver::new());
    observer.set_nodes(vec![node("n1", [10, 0, 0, 1])]);
    observer.set_specs(vec![spec("api.example.com", 300, false, "ns/svc")]);

    let resolver = Arc::new(FakeZoneResolver::new(vec![zone("z1", "example.com")]));
    let provider = Arc::new(FakeDnsProvider::new());

    let (engine, mut events) = ReconciliationEngine::new(
        resolver,
        provider.clone(),
        observer.clone(),
        fast_config(),
        shared_status(),
    );
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(engine.run_with_shutdown(Some(shutdown_rx)));

    // startup pass
    wait_for_pass_completed(&mut events).await;

    // a burst of notifications before the engine drains its single-slot channel must
    // collapse into exactly one further pass, not one per notification.
    for _ in 0..10 {
        observer.notify();
    }
    wait_for_pass_completed(&mut events).await;

    // confirm no further pass starts on its own within a short window: the timer is an hour
    // out and the signal channel is now empty, so the engine should sit idle.
    let extra = timeout(Duration::from_millis(300), events.recv()).await;
    assert!(extra.is_err(), "no further pass should have started from the coalesced burst");

    let _ = shutdown_tx.send(());
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_while_idle_terminates_promptly() {
    let observer = Arc::new(FakeClusterObserver::new());
    observer.set_nodes(vec![node("n1", [10, 0, 0, 1])]);
    observer.set_specs(vec![spec("api.example.com", 300, false, "ns/svc")]);

    let resolver = Arc::new(FakeZoneResolver::new(vec![zone("z1", "example.com")]));
    let provider = Arc::new(FakeDnsProvider::new());

    let (engine, mut events) = ReconciliationEngine::new(
        resolver,
        provider,
        observer,
        fast_config(),
        shared_status(),
    );
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(engine.run_with_shutdown(Some(shutdown_rx)));

    wait_for_pass_completed(&mut events).await;

    let _ = shutdown_tx.send(());
    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("engine did not shut down within the timeout");
    result.unwrap().unwrap();
}

#[tokio::test]
async fn pass_not_run_while_observer_has_not_synced() {
    let observer = Arc::new(FakeClusterObserver::new());
    observer.set_synced(false);
    observer.set_nodes(vec![node("n1", [10, 0, 0, 1])]);
    observer.set_specs(vec![spec("api.example.com", 300, false, "ns/svc")]);

    let resolver = Arc::new(FakeZoneResolver::new(vec![zone("z1", "example.com")]));
    let provider = Arc::new(FakeDnsProvider::new());

    let (engine, mut events) = ReconciliationEngine::new(
        resolver,
        provider.clone(),
        observer,
        fast_config(),
        shared_status(),
    );
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(engine.run_with_shutdown(Some(shutdown_rx)));

    let ev = wait_for_pass_completed(&mut events).await;
    assert_eq!(
        ev,
        EngineEvent::PassCompleted {
            outcome: rrdns_core::status::PassOutcome::Failed,
            creates: 0,
            deletes: 0,
            failures: 0,
        }
    );
    assert_eq!(provider.create_call_count(), 0);

    let _ = shutdown_tx.send(());
    handle.await.unwrap().unwrap();
}

async fn wait_for_pass_completed(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<EngineEvent>,
) -> EngineEvent {
    loop {
        let ev = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for engine event")
            .expect("engine event channel closed unexpectedly");
        if matches!(ev, EngineEvent::PassCompleted { .. }) {
            return ev;
        }
    }
}
