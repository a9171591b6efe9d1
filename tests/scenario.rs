use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use kvbench::backend::{BackendAdapter, Backends};
use kvbench::conf::{ConcurrencyLimit, FanoutMode};
use kvbench::core::BenchError;
use kvbench::measure::{BenchmarkResult, Operation};
use kvbench::scenario::{Fanout, MatrixKey, Outcome, ResultMatrix, ScenarioRunner};
use kvbench::testutil::{FailPoint, FailingBackend, MemoryBackend, small_sweep};
use kvbench::workload::WorkloadGenerator;

fn key(size: usize, batch: Option<usize>, operation: Operation) -> MatrixKey {
    MatrixKey::new(size, batch, operation)
}

fn completed<'a>(matrix: &'a ResultMatrix, key: &MatrixKey, backend: &str) -> &'a BenchmarkResult {
    match matrix.outcome(key, backend) {
        Some(Outcome::Completed(result)) => result,
        other => panic!("expected a result for {backend} at {key:?}, got {other:?}"),
    }
}

fn failure_reason<'a>(matrix: &'a ResultMatrix, key: &MatrixKey, backend: &str) -> &'a str {
    match matrix.outcome(key, backend) {
        Some(Outcome::Failed { reason }) => reason,
        other => panic!("expected a failure for {backend} at {key:?}, got {other:?}"),
    }
}

async fn connect(adapters: Vec<Box<dyn BackendAdapter>>) -> Backends {
    Backends::connect(adapters).await.unwrap()
}

#[tokio::test]
async fn test_sweep_issues_expected_calls() {
    let backend = MemoryBackend::new("memory");
    let calls = backend.calls();
    let backends = connect(vec![Box::new(backend)]).await;
    let sweep = small_sweep(1_000, 100);

    let matrix = ScenarioRunner::new(&backends, &sweep)
        .with_generator(WorkloadGenerator::with_seed(sweep.value_size_ceiling, 7))
        .run()
        .await
        .unwrap();
    backends.close().await;

    assert_eq!(calls.put_one.load(Ordering::SeqCst), 1_000);
    assert_eq!(calls.get_one.load(Ordering::SeqCst), 1_000);
    assert_eq!(calls.get_batch.load(Ordering::SeqCst), 10);
    // 10 batch writes, one preload for reads, one load for the memory phase
    assert_eq!(calls.put_batch.load(Ordering::SeqCst), 12);
    assert_eq!(calls.reset.load(Ordering::SeqCst), 1);
    assert_eq!(calls.disconnect.load(Ordering::SeqCst), 1);

    // single write, batch write, read, batch read, memory
    assert_eq!(matrix.len(), 5);
    assert_eq!(matrix.failures(), 0);

    let batch_write = completed(&matrix, &key(1_000, Some(100), Operation::BatchWrite), "memory");
    assert_eq!(batch_write.item_count, 1_000);
    assert!(batch_write.duration_ms > 0.0);
    assert_eq!(batch_write.fanout, Fanout::Serial);

    let read = completed(&matrix, &key(1_000, None, Operation::Read), "memory");
    let preload = read.preload.as_ref().unwrap();
    assert_eq!(preload.item_count, 1_000);
    assert!(preload.duration_ms > 0.0);
}

#[tokio::test]
async fn test_failure_is_isolated_to_its_backend() {
    let broken = FailingBackend::new(MemoryBackend::new("broken"), &[FailPoint::GetOne]);
    let healthy = MemoryBackend::new("healthy");
    let backends = connect(vec![Box::new(broken), Box::new(healthy)]).await;
    let sweep = small_sweep(200, 50);

    let matrix = ScenarioRunner::new(&backends, &sweep).run().await.unwrap();
    backends.close().await;

    let read = key(200, None, Operation::Read);
    assert!(failure_reason(&matrix, &read, "broken").contains("injected GetOne failure"));
    assert_eq!(completed(&matrix, &read, "healthy").item_count, 200);

    // later phases still run for the failing backend
    completed(&matrix, &key(200, Some(50), Operation::BatchRead), "broken");
    completed(&matrix, &key(200, None, Operation::Memory), "broken");
    assert_eq!(matrix.failures(), 1);
}

#[tokio::test]
async fn test_memory_phase_reports_delta_only_with_counter() {
    let counted = MemoryBackend::new("counted").with_memory_counter();
    let uncounted = MemoryBackend::new("uncounted");
    let backends = connect(vec![Box::new(counted), Box::new(uncounted)]).await;
    let sweep = small_sweep(100, 10);

    let matrix = ScenarioRunner::new(&backends, &sweep).run().await.unwrap();
    backends.close().await;

    let memory = key(100, None, Operation::Memory);
    let delta = completed(&matrix, &memory, "counted").backend_memory_delta;
    assert!(matches!(delta, Some(bytes) if bytes > 0));
    assert_eq!(completed(&matrix, &memory, "uncounted").backend_memory_delta, None);
    assert!(completed(&matrix, &memory, "counted").preload.is_none());
}

#[tokio::test]
async fn test_unconnected_backend_fills_its_slots_with_failures() {
    let inner = MemoryBackend::new("offline");
    let offline_calls = inner.calls();
    let offline = FailingBackend::new(inner, &[FailPoint::Connect]);
    let online = MemoryBackend::new("online");
    let backends = connect(vec![Box::new(offline), Box::new(online)]).await;
    assert_eq!(backends.len(), 2);
    let sweep = small_sweep(50, 10);

    let matrix = ScenarioRunner::new(&backends, &sweep).run().await.unwrap();
    backends.close().await;

    for entry in matrix.entries() {
        let reason = failure_reason(&matrix, &entry.key, "offline");
        assert!(reason.starts_with("not connected:"), "{reason}");
        assert!(reason.contains("connection refused"), "{reason}");
        assert!(!matrix.outcome(&entry.key, "online").unwrap().is_failed());
    }
    assert_eq!(offline_calls.connect.load(Ordering::SeqCst), 0);
    assert_eq!(offline_calls.put_one.load(Ordering::SeqCst), 0);
    assert_eq!(offline_calls.disconnect.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_all_backends_failing_to_connect_aborts() {
    let first = FailingBackend::new(MemoryBackend::new("first"), &[FailPoint::Connect]);
    let second = FailingBackend::new(MemoryBackend::new("second"), &[FailPoint::Connect]);

    let err = Backends::connect(vec![Box::new(first), Box::new(second)])
        .await
        .err()
        .unwrap();

    match err {
        BenchError::ConnectionError { backend, reason } => {
            assert_eq!(backend, "all backends");
            assert!(reason.contains("first"));
            assert!(reason.contains("second"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let backend = MemoryBackend::new("memory");
    backend.connect().await.unwrap();
    backend.disconnect().await.unwrap();
    backend.disconnect().await.unwrap();

    assert!(!backend.is_connected());
    assert_eq!(
        backend.get_one("missing").await,
        Err(BenchError::NotConnected("memory".to_string()))
    );
}

#[tokio::test]
async fn test_hung_operations_become_timeouts() {
    let slow = MemoryBackend::new("slow").with_latency(Duration::from_millis(500));
    let backends = connect(vec![Box::new(slow)]).await;
    let mut sweep = small_sweep(10, 5);
    sweep.op_timeout = Some(Duration::from_millis(20));

    let matrix = ScenarioRunner::new(&backends, &sweep).run().await.unwrap();
    backends.close().await;

    assert_eq!(matrix.failures(), matrix.len());
    let reason = failure_reason(&matrix, &key(10, None, Operation::SingleWrite), "slow");
    assert_eq!(reason, "slow operation timed out after 20ms");
}

#[tokio::test]
async fn test_concurrent_fanout_is_recorded_on_results() {
    let backend = MemoryBackend::new("memory");
    let calls = backend.calls();
    let backends = connect(vec![Box::new(backend)]).await;
    let mut sweep = small_sweep(500, 100);
    sweep.fanout = FanoutMode::Concurrent;
    sweep.concurrency = ConcurrencyLimit::Bounded(NonZeroUsize::new(8).unwrap());

    let matrix = ScenarioRunner::new(&backends, &sweep).run().await.unwrap();
    backends.close().await;

    let single = completed(&matrix, &key(500, None, Operation::SingleWrite), "memory");
    assert_eq!(
        single.fanout,
        Fanout::Concurrent {
            limit: ConcurrencyLimit::Bounded(NonZeroUsize::new(8).unwrap())
        }
    );
    assert_eq!(calls.put_one.load(Ordering::SeqCst), 500);
    assert_eq!(calls.get_one.load(Ordering::SeqCst), 500);
}
