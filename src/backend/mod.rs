//! Pluggable backend trait normalizing structurally different stores.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::conf::{BackendKind, Config};
use crate::core::BenchError;
use crate::workload::TestItem;

pub mod aerospike_record;
pub mod redis_flat;
mod session;

pub use aerospike_record::AerospikeBackend;
pub use redis_flat::RedisBackend;
pub use session::{Backend, Backends};

/// Capability set every benchmarked store exposes.
///
/// Only string keys and string values are shared between backends. Batch
/// operations are not atomic: an adapter may pipeline, use a native batch
/// primitive or fan out, but any failed member must fail the call.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Label used in the result matrix and the report.
    fn name(&self) -> &str;

    /// Establishes the session. A second call on a connected adapter is a no-op.
    async fn connect(&self) -> Result<(), BenchError>;

    /// Releases the session. Safe to call repeatedly and after a failed connect.
    async fn disconnect(&self) -> Result<(), BenchError>;

    async fn put_one(&self, key: &str, value: &str) -> Result<(), BenchError>;

    /// `None` for a missing key.
    async fn get_one(&self, key: &str) -> Result<Option<String>, BenchError>;

    async fn put_batch(&self, items: &[TestItem]) -> Result<(), BenchError>;

    async fn get_batch(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Option<String>>, BenchError>;

    /// Clears the benchmark keyspace. Returns `false` when unsupported.
    async fn reset(&self) -> Result<bool, BenchError> {
        Ok(false)
    }

    /// Global memory counter of the backend, only comparable with itself.
    async fn memory_snapshot(&self) -> Result<Option<u64>, BenchError> {
        Ok(None)
    }
}

pub fn build(kind: BackendKind, config: &Config) -> Box<dyn BackendAdapter> {
    match kind {
        BackendKind::Redis => Box::new(RedisBackend::new(config.redis.clone())),
        BackendKind::Aerospike => Box::new(AerospikeBackend::new(config.aerospike.clone())),
    }
}
