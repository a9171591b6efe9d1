use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;

use crate::conf::{ConcurrencyLimit, FanoutMode, SweepConfig};
use crate::core::BenchError;

/// How the operations of one phase are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Fanout {
    /// Operation `i + 1` starts only after operation `i` completed.
    Serial,
    /// All operations in flight at once, up to `limit`; completion order is unspecified.
    Concurrent { limit: ConcurrencyLimit },
}

impl Fanout {
    pub fn from_config(sweep: &SweepConfig) -> Self {
        match sweep.fanout {
            FanoutMode::Serial => Fanout::Serial,
            FanoutMode::Concurrent => Fanout::Concurrent {
                limit: sweep.concurrency,
            },
        }
    }
}

impl fmt::Display for Fanout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fanout::Serial => write!(f, "serial"),
            Fanout::Concurrent { limit } => write!(f, "concurrent({limit})"),
        }
    }
}

/// Awaits `operation`, failing with [`BenchError::Timeout`] once `after` elapses.
pub async fn with_timeout<T, Fut>(
    operation: Fut,
    after: Option<Duration>,
    backend: &str,
) -> Result<T, BenchError>
where
    Fut: Future<Output = Result<T, BenchError>>,
{
    match after {
        None => operation.await,
        Some(after) => tokio::time::timeout(after, operation)
            .await
            .map_err(|_| BenchError::Timeout {
                backend: backend.to_string(),
                after,
            })?,
    }
}

/// Runs `op(0) .. op(count - 1)` under `fanout`, stopping at the first error.
pub async fn fan_out<F, Fut>(
    fanout: Fanout,
    op_timeout: Option<Duration>,
    backend: &str,
    count: usize,
    op: F,
) -> Result<(), BenchError>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<(), BenchError>>,
{
    match fanout {
        Fanout::Serial => {
            for i in 0..count {
                with_timeout(op(i), op_timeout, backend).await?;
            }
            Ok(())
        }
        Fanout::Concurrent { limit } => {
            stream::iter(0..count)
                .map(Ok::<usize, BenchError>)
                .try_for_each_concurrent(limit.max_in_flight(), |i| {
                    with_timeout(op(i), op_timeout, backend)
                })
                .await
        }
    }
}
