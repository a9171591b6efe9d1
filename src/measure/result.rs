use std::fmt;

use serde::Serialize;

use crate::core::BenchError;
use crate::measure::{MemoryDelta, Measurement};
use crate::scenario::Fanout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SingleWrite,
    BatchWrite,
    Read,
    BatchRead,
    Memory,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SingleWrite => "single_write",
            Operation::BatchWrite => "batch_write",
            Operation::Read => "read",
            Operation::BatchRead => "batch_read",
            Operation::Memory => "memory",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing of the batch write that repopulates a backend before a measured phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preload {
    pub item_count: usize,
    pub duration_ms: f64,
}

impl Preload {
    pub fn new(item_count: usize, measurement: &Measurement) -> Self {
        Self {
            item_count,
            duration_ms: measurement.elapsed_ms(),
        }
    }
}

/// Point estimate for one backend, one phase, one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    pub operation: Operation,
    pub backend: String,
    pub item_count: usize,
    pub duration_ms: f64,
    pub ops_per_second: f64,
    pub avg_latency_ms: f64,
    pub process_memory: MemoryDelta,
    /// Growth of the backend's own memory counter. `None` when the backend has no counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_memory_delta: Option<i64>,
    pub fanout: Fanout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preload: Option<Preload>,
}

impl BenchmarkResult {
    pub fn new(
        operation: Operation,
        backend: &str,
        item_count: usize,
        measurement: &Measurement,
        fanout: Fanout,
    ) -> Result<Self, BenchError> {
        if item_count == 0 {
            return Err(BenchError::MeasurementError(format!(
                "{operation} on {backend} measured zero items"
            )));
        }
        let duration_ms = measurement.elapsed_ms();
        if duration_ms <= 0.0 || !duration_ms.is_finite() {
            return Err(BenchError::MeasurementError(format!(
                "{operation} on {backend} took no measurable time"
            )));
        }
        Ok(Self {
            operation,
            backend: backend.to_string(),
            item_count,
            duration_ms,
            ops_per_second: item_count as f64 / duration_ms * 1000.0,
            avg_latency_ms: duration_ms / item_count as f64,
            process_memory: measurement.memory,
            backend_memory_delta: None,
            fanout,
            preload: None,
        })
    }

    pub fn with_preload(mut self, preload: Preload) -> Self {
        self.preload = Some(preload);
        self
    }

    pub fn with_backend_memory_delta(mut self, delta: Option<i64>) -> Self {
        self.backend_memory_delta = delta;
        self
    }
}
