//! Timing and memory measurement around a single asynchronous operation.

mod memory;
mod result;

use std::future::Future;
use std::time::{Duration, Instant};

pub use memory::{MemoryDelta, ProcessMemory};
pub use result::{BenchmarkResult, Operation, Preload};

/// Wall-clock time and process memory change of one measured operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub elapsed: Duration,
    pub memory: MemoryDelta,
}

impl Measurement {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Awaits `operation` to completion between two clock readings.
///
/// Memory snapshots are taken outside the clock readings so their cost does
/// not show up in `elapsed`. An error from `operation` is returned unchanged.
pub async fn measure<F, T, E>(operation: F) -> Result<(T, Measurement), E>
where
    F: Future<Output = Result<T, E>>,
{
    let memory_before = ProcessMemory::snapshot();
    let started = Instant::now();
    let output = operation.await?;
    let elapsed = started.elapsed();
    let memory_after = ProcessMemory::snapshot();
    Ok((
        output,
        Measurement {
            elapsed,
            memory: memory_after.delta_since(&memory_before),
        },
    ))
}
