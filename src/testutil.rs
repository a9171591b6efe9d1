//! In-process backends for tests and benchmarks.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::BackendAdapter;
use crate::conf::SweepConfig;
use crate::core::BenchError;
use crate::workload::TestItem;

/// Call counters of a [`MemoryBackend`].
#[derive(Debug, Default)]
pub struct Calls {
    pub connect: AtomicUsize,
    pub disconnect: AtomicUsize,
    pub put_one: AtomicUsize,
    pub get_one: AtomicUsize,
    pub put_batch: AtomicUsize,
    pub get_batch: AtomicUsize,
    pub reset: AtomicUsize,
}

/// A `HashMap` behind the adapter trait, with optional latency and memory counter.
pub struct MemoryBackend {
    name: String,
    store: Mutex<HashMap<String, String>>,
    connected: AtomicBool,
    latency: Option<Duration>,
    memory_counter: bool,
    calls: Arc<Calls>,
}

impl MemoryBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            store: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(false),
            latency: None,
            memory_counter: false,
            calls: Arc::new(Calls::default()),
        }
    }

    /// Counters that stay readable after the backend is boxed.
    pub fn calls(&self) -> Arc<Calls> {
        Arc::clone(&self.calls)
    }

    /// Sleeps this long inside every data operation.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reports stored key and value bytes as its memory counter.
    pub fn with_memory_counter(mut self) -> Self {
        self.memory_counter = true;
        self
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn check_connected(&self) -> Result<(), BenchError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BenchError::NotConnected(self.name.clone()))
        }
    }

    async fn pause(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }
}

#[async_trait]
impl BackendAdapter for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), BenchError> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BenchError> {
        self.calls.disconnect.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn put_one(&self, key: &str, value: &str) -> Result<(), BenchError> {
        self.check_connected()?;
        self.calls.put_one.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.store
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_one(&self, key: &str) -> Result<Option<String>, BenchError> {
        self.check_connected()?;
        self.calls.get_one.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.store.lock().unwrap().get(key).cloned())
    }

    async fn put_batch(&self, items: &[TestItem]) -> Result<(), BenchError> {
        self.check_connected()?;
        self.calls.put_batch.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let mut store = self.store.lock().unwrap();
        for item in items {
            store.insert(item.key.clone(), item.value.clone());
        }
        Ok(())
    }

    async fn get_batch(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Option<String>>, BenchError> {
        self.check_connected()?;
        self.calls.get_batch.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let store = self.store.lock().unwrap();
        Ok(keys
            .iter()
            .map(|key| (key.clone(), store.get(key).cloned()))
            .collect())
    }

    async fn reset(&self) -> Result<bool, BenchError> {
        self.check_connected()?;
        self.calls.reset.fetch_add(1, Ordering::SeqCst);
        self.store.lock().unwrap().clear();
        Ok(true)
    }

    async fn memory_snapshot(&self) -> Result<Option<u64>, BenchError> {
        self.check_connected()?;
        if !self.memory_counter {
            return Ok(None);
        }
        let bytes = self
            .store
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        Ok(Some(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Connect,
    PutOne,
    GetOne,
    PutBatch,
    GetBatch,
}

/// Wraps a [`MemoryBackend`] and fails the selected operations.
pub struct FailingBackend {
    inner: MemoryBackend,
    fail_on: HashSet<FailPoint>,
}

impl FailingBackend {
    pub fn new(inner: MemoryBackend, fail_on: &[FailPoint]) -> Self {
        Self {
            inner,
            fail_on: fail_on.iter().copied().collect(),
        }
    }

    fn check(&self, point: FailPoint) -> Result<(), BenchError> {
        if self.fail_on.contains(&point) {
            Err(BenchError::operation(
                self.inner.name(),
                format!("injected {point:?} failure"),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BackendAdapter for FailingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn connect(&self) -> Result<(), BenchError> {
        if self.fail_on.contains(&FailPoint::Connect) {
            return Err(BenchError::connection(self.name(), "connection refused"));
        }
        self.inner.connect().await
    }

    async fn disconnect(&self) -> Result<(), BenchError> {
        self.inner.disconnect().await
    }

    async fn put_one(&self, key: &str, value: &str) -> Result<(), BenchError> {
        self.check(FailPoint::PutOne)?;
        self.inner.put_one(key, value).await
    }

    async fn get_one(&self, key: &str) -> Result<Option<String>, BenchError> {
        self.check(FailPoint::GetOne)?;
        self.inner.get_one(key).await
    }

    async fn put_batch(&self, items: &[TestItem]) -> Result<(), BenchError> {
        self.check(FailPoint::PutBatch)?;
        self.inner.put_batch(items).await
    }

    async fn get_batch(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Option<String>>, BenchError> {
        self.check(FailPoint::GetBatch)?;
        self.inner.get_batch(keys).await
    }
}

/// A one-point sweep: `size` items, one batch size, small values.
pub fn small_sweep(size: usize, batch_size: usize) -> SweepConfig {
    SweepConfig {
        dataset_sizes: vec![size],
        batch_sizes: vec![batch_size],
        value_size_ceiling: 16,
        ..SweepConfig::default()
    }
}
