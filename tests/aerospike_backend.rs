use std::time::Duration;

use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

use kvbench::backend::{AerospikeBackend, BackendAdapter, Backends};
use kvbench::conf::AerospikeConfig;
use kvbench::core::BenchError;
use kvbench::measure::Operation;
use kvbench::scenario::{MatrixKey, ScenarioRunner};
use kvbench::testutil::small_sweep;
use kvbench::workload::WorkloadGenerator;

const AEROSPIKE_PORT: u16 = 3000;

async fn start_aerospike() -> (ContainerAsync<GenericImage>, AerospikeConfig) {
    let container = GenericImage::new("aerospike/aerospike-server", "7.2.0.1")
        .with_exposed_port(AEROSPIKE_PORT.tcp())
        .start()
        .await
        .unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(AEROSPIKE_PORT).await.unwrap();
    let config = AerospikeConfig {
        hosts: format!("{host}:{port}"),
        ..AerospikeConfig::default()
    };
    wait_until_ready(&config).await;
    (container, config)
}

/// The server accepts connections a few seconds after the container starts.
async fn wait_until_ready(config: &AerospikeConfig) {
    let backend = AerospikeBackend::new(config.clone());
    for _ in 0..60 {
        if backend.connect().await.is_ok() {
            backend.disconnect().await.unwrap();
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("aerospike at {} never became ready", config.hosts);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_aerospike_round_trip() {
    let (_container, config) = start_aerospike().await;
    let backend = AerospikeBackend::new(config);
    backend.connect().await.unwrap();
    backend.connect().await.unwrap();

    backend.put_one("k1", "v1").await.unwrap();
    assert_eq!(backend.get_one("k1").await.unwrap(), Some("v1".to_string()));
    assert_eq!(backend.get_one("absent").await.unwrap(), None);

    let items = WorkloadGenerator::with_seed(64, 1).generate(50).unwrap();
    backend.put_batch(&items).await.unwrap();
    let mut keys: Vec<String> = items.iter().map(|item| item.key.clone()).collect();
    keys.push("absent".to_string());
    let values = backend.get_batch(&keys).await.unwrap();
    assert_eq!(values.len(), 51);
    assert_eq!(values["absent"], None);
    for item in &items {
        assert_eq!(values[&item.key].as_deref(), Some(item.value.as_str()));
    }

    assert!(backend.reset().await.unwrap());
    assert_eq!(backend.get_one("k1").await.unwrap(), None);
    assert_eq!(backend.get_one(&items[0].key).await.unwrap(), None);
    assert_eq!(backend.memory_snapshot().await, Ok(None));

    backend.disconnect().await.unwrap();
    backend.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_aerospike_batch_write_counts_failures() {
    let (_container, config) = start_aerospike().await;
    let backend = AerospikeBackend::new(AerospikeConfig {
        namespace: "no_such_namespace".to_string(),
        ..config
    });
    backend.connect().await.unwrap();

    let items = WorkloadGenerator::with_seed(8, 3).generate(3).unwrap();
    match backend.put_batch(&items).await {
        Err(BenchError::OperationError { backend, reason }) => {
            assert_eq!(backend, "aerospike");
            assert!(reason.starts_with("3 of 3 batch writes failed"), "{reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    backend.disconnect().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_aerospike_sweep() {
    let (_container, config) = start_aerospike().await;
    let backends = Backends::connect(vec![Box::new(AerospikeBackend::new(config))])
        .await
        .unwrap();
    let sweep = small_sweep(200, 50);

    let matrix = ScenarioRunner::new(&backends, &sweep).run().await.unwrap();
    backends.close().await;

    assert_eq!(matrix.failures(), 0);
    let memory = matrix
        .outcome(&MatrixKey::new(200, None, Operation::Memory), "aerospike")
        .and_then(|outcome| outcome.result())
        .unwrap();
    assert_eq!(memory.backend_memory_delta, None);
}
