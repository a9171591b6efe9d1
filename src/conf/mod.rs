mod aerospike;
mod config;
mod redis;
mod sweep;

pub use aerospike::AerospikeConfig;
pub use config::Config;
pub use redis::RedisConfig;
pub use sweep::{BackendKind, ConcurrencyLimit, FanoutMode, SweepConfig};
