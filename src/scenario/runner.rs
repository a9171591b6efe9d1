use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};

use crate::backend::{BackendAdapter, Backends};
use crate::conf::SweepConfig;
use crate::core::BenchError;
use crate::measure::{BenchmarkResult, Operation, Preload, measure};
use crate::workload::{TestItem, WorkloadGenerator, batches};

use super::fanout::{Fanout, fan_out, with_timeout};
use super::matrix::{MatrixKey, Outcome, ResultMatrix};

#[derive(Debug, Clone, Copy)]
enum Step {
    SingleWrite,
    BatchWrite(usize),
    Read,
    BatchRead(usize),
    Memory,
}

impl Step {
    fn key(&self, dataset_size: usize) -> MatrixKey {
        match *self {
            Step::SingleWrite => MatrixKey::new(dataset_size, None, Operation::SingleWrite),
            Step::BatchWrite(b) => MatrixKey::new(dataset_size, Some(b), Operation::BatchWrite),
            Step::Read => MatrixKey::new(dataset_size, None, Operation::Read),
            Step::BatchRead(b) => MatrixKey::new(dataset_size, Some(b), Operation::BatchRead),
            Step::Memory => MatrixKey::new(dataset_size, None, Operation::Memory),
        }
    }
}

/// Drives every phase over the sweep and collects a [`ResultMatrix`].
///
/// Per dataset size the phases run in this order: single write, batch write
/// per batch size, read (after a separately timed preload), batch read per
/// batch size over the keys loaded for the read phase, and memory (reset,
/// counter, preload, counter). Each phase runs once per backend. A failure
/// is recorded in that backend's slot and the sweep moves on.
pub struct ScenarioRunner<'a> {
    backends: &'a Backends,
    sweep: &'a SweepConfig,
    generator: WorkloadGenerator,
    fanout: Fanout,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(backends: &'a Backends, sweep: &'a SweepConfig) -> Self {
        Self {
            backends,
            sweep,
            generator: WorkloadGenerator::new(sweep.value_size_ceiling),
            fanout: Fanout::from_config(sweep),
        }
    }

    pub fn with_generator(mut self, generator: WorkloadGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn fanout(&self) -> Fanout {
        self.fanout
    }

    pub async fn run(mut self) -> Result<ResultMatrix, BenchError> {
        self.sweep.validate()?;
        let mut matrix = ResultMatrix::new();
        for &size in &self.sweep.dataset_sizes {
            info!(
                "sweep point: {} items, batch sizes {:?}, fanout {}",
                size, self.sweep.batch_sizes, self.fanout
            );
            self.run_size(size, &mut matrix).await?;
        }
        info!(
            "sweep finished: {} matrix entries, {} failed slots",
            matrix.len(),
            matrix.failures()
        );
        Ok(matrix)
    }

    async fn run_size(&mut self, size: usize, matrix: &mut ResultMatrix) -> Result<(), BenchError> {
        let dataset = self.generator.generate(size)?;
        self.run_step(Step::SingleWrite, &dataset, matrix).await;

        for &batch_size in &self.sweep.batch_sizes {
            let dataset = self.generator.generate(size)?;
            self.run_step(Step::BatchWrite(batch_size), &dataset, matrix)
                .await;
        }

        let dataset = self.generator.generate(size)?;
        self.run_step(Step::Read, &dataset, matrix).await;
        for &batch_size in &self.sweep.batch_sizes {
            self.run_step(Step::BatchRead(batch_size), &dataset, matrix)
                .await;
        }

        let dataset = self.generator.generate(size)?;
        self.run_step(Step::Memory, &dataset, matrix).await;
        Ok(())
    }

    async fn run_step(&self, step: Step, dataset: &[TestItem], matrix: &mut ResultMatrix) {
        let key = step.key(dataset.len());
        for backend in self.backends.iter() {
            let outcome = match backend.adapter() {
                Some(adapter) => {
                    info!("[{}] {:?}", backend.name(), step);
                    let result = self.execute(step, adapter, dataset).await;
                    if let Err(err) = &result {
                        warn!("[{}] {:?} failed: {}", backend.name(), step, err);
                    }
                    Outcome::from(result)
                }
                None => Outcome::Failed {
                    reason: format!(
                        "not connected: {}",
                        backend.connect_error().unwrap_or("unknown")
                    ),
                },
            };
            matrix.record(key, backend.name(), outcome);
        }
    }

    async fn execute(
        &self,
        step: Step,
        adapter: &dyn BackendAdapter,
        dataset: &[TestItem],
    ) -> Result<BenchmarkResult, BenchError> {
        match step {
            Step::SingleWrite => self.single_write(adapter, dataset).await,
            Step::BatchWrite(batch_size) => self.batch_write(adapter, dataset, batch_size).await,
            Step::Read => self.read(adapter, dataset).await,
            Step::BatchRead(batch_size) => self.batch_read(adapter, dataset, batch_size).await,
            Step::Memory => self.memory(adapter, dataset).await,
        }
    }

    async fn single_write(
        &self,
        adapter: &dyn BackendAdapter,
        dataset: &[TestItem],
    ) -> Result<BenchmarkResult, BenchError> {
        let name = adapter.name();
        let (_, measurement) = measure(fan_out(
            self.fanout,
            self.sweep.op_timeout,
            name,
            dataset.len(),
            move |i| {
                let item = &dataset[i];
                adapter.put_one(&item.key, &item.value)
            },
        ))
        .await?;
        BenchmarkResult::new(
            Operation::SingleWrite,
            name,
            dataset.len(),
            &measurement,
            self.fanout,
        )
    }

    async fn batch_write(
        &self,
        adapter: &dyn BackendAdapter,
        dataset: &[TestItem],
        batch_size: usize,
    ) -> Result<BenchmarkResult, BenchError> {
        let parts = batches(dataset, batch_size)?;
        debug!("[{}] writing {} batches", adapter.name(), parts.len());
        let (_, measurement) = measure(self.put_batches(adapter, &parts)).await?;
        BenchmarkResult::new(
            Operation::BatchWrite,
            adapter.name(),
            dataset.len(),
            &measurement,
            self.fanout,
        )
    }

    /// Repopulates the backend with `dataset`, timed on its own.
    async fn preload(
        &self,
        adapter: &dyn BackendAdapter,
        dataset: &[TestItem],
    ) -> Result<Preload, BenchError> {
        let parts = batches(dataset, self.sweep.preload_batch_size)?;
        let (_, measurement) = measure(self.put_batches(adapter, &parts)).await?;
        Ok(Preload::new(dataset.len(), &measurement))
    }

    async fn put_batches(
        &self,
        adapter: &dyn BackendAdapter,
        parts: &[&[TestItem]],
    ) -> Result<(), BenchError> {
        fan_out(
            self.fanout,
            self.sweep.op_timeout,
            adapter.name(),
            parts.len(),
            move |i| adapter.put_batch(parts[i]),
        )
        .await
    }

    async fn read(
        &self,
        adapter: &dyn BackendAdapter,
        dataset: &[TestItem],
    ) -> Result<BenchmarkResult, BenchError> {
        let name = adapter.name();
        let preload = self.preload(adapter, dataset).await?;

        let misses = AtomicUsize::new(0);
        let misses_ref = &misses;
        let (_, measurement) = measure(fan_out(
            self.fanout,
            self.sweep.op_timeout,
            name,
            dataset.len(),
            move |i| {
                let key = &dataset[i].key;
                async move {
                    if adapter.get_one(key).await?.is_none() {
                        misses_ref.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok::<(), BenchError>(())
                }
            },
        ))
        .await?;

        let misses = misses.into_inner();
        if misses > 0 {
            warn!("[{name}] {misses} of {} preloaded keys read back empty", dataset.len());
        }
        Ok(BenchmarkResult::new(Operation::Read, name, dataset.len(), &measurement, self.fanout)?
            .with_preload(preload))
    }

    /// Reads back the keys loaded by the read phase.
    async fn batch_read(
        &self,
        adapter: &dyn BackendAdapter,
        dataset: &[TestItem],
        batch_size: usize,
    ) -> Result<BenchmarkResult, BenchError> {
        let name = adapter.name();
        let key_batches: Vec<Vec<String>> = batches(dataset, batch_size)?
            .iter()
            .map(|batch| batch.iter().map(|item| item.key.clone()).collect())
            .collect();
        let key_batches = &key_batches;
        let (_, measurement) = measure(fan_out(
            self.fanout,
            self.sweep.op_timeout,
            name,
            key_batches.len(),
            move |i| {
                let keys = &key_batches[i];
                async move { adapter.get_batch(keys).await.map(|_| ()) }
            },
        ))
        .await?;
        BenchmarkResult::new(
            Operation::BatchRead,
            name,
            dataset.len(),
            &measurement,
            self.fanout,
        )
    }

    /// Times a fresh load and, when the backend has a memory counter, reports its growth.
    async fn memory(
        &self,
        adapter: &dyn BackendAdapter,
        dataset: &[TestItem],
    ) -> Result<BenchmarkResult, BenchError> {
        let name = adapter.name();
        let timeout = self.sweep.op_timeout;
        if !with_timeout(adapter.reset(), timeout, name).await? {
            debug!("[{name}] cannot reset, memory is measured on top of existing data");
        }
        let baseline = with_timeout(adapter.memory_snapshot(), timeout, name).await?;

        let parts = batches(dataset, self.sweep.preload_batch_size)?;
        let (_, measurement) = measure(self.put_batches(adapter, &parts)).await?;

        let after = with_timeout(adapter.memory_snapshot(), timeout, name).await?;
        let delta = match (baseline, after) {
            (Some(before), Some(after)) => Some(after as i64 - before as i64),
            _ => None,
        };
        Ok(BenchmarkResult::new(Operation::Memory, name, dataset.len(), &measurement, self.fanout)?
            .with_backend_memory_delta(delta))
    }
}
