use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::BenchError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Redis,
    Aerospike,
}

/// How operations inside one phase are issued.
///
/// Serial is the default. Firing every operation of a phase at once, with no
/// cap, is `fanout = "concurrent"` with the default `concurrency = "unbounded"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FanoutMode {
    /// Await each operation before issuing the next.
    #[default]
    Serial,
    /// Issue every operation of a phase, then await them all.
    Concurrent,
}

/// In-flight cap applied to concurrent fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyLimit {
    #[default]
    Unbounded,
    Bounded(NonZeroUsize),
}

impl ConcurrencyLimit {
    pub fn max_in_flight(&self) -> Option<usize> {
        match self {
            ConcurrencyLimit::Unbounded => None,
            ConcurrencyLimit::Bounded(n) => Some(n.get()),
        }
    }
}

impl FromStr for ConcurrencyLimit {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") {
            return Ok(ConcurrencyLimit::Unbounded);
        }
        s.parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .map(ConcurrencyLimit::Bounded)
            .ok_or_else(|| {
                BenchError::ConfigParsingError(format!(
                    "concurrency must be \"unbounded\" or a positive integer, got \"{s}\""
                ))
            })
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyLimit::Unbounded => write!(f, "unbounded"),
            ConcurrencyLimit::Bounded(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for ConcurrencyLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConcurrencyLimit::Unbounded => serializer.serialize_str("unbounded"),
            ConcurrencyLimit::Bounded(n) => serializer.serialize_u64(n.get() as u64),
        }
    }
}

impl<'de> Deserialize<'de> for ConcurrencyLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => NonZeroUsize::new(n as usize)
                .map(ConcurrencyLimit::Bounded)
                .ok_or_else(|| D::Error::custom("concurrency must be positive")),
            Raw::Text(text) => text.parse().map_err(D::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    #[serde(default = "SweepConfig::default_dataset_sizes")]
    pub dataset_sizes: Vec<usize>,
    #[serde(default = "SweepConfig::default_batch_sizes")]
    pub batch_sizes: Vec<usize>,
    /// Exclusive upper bound of the random value padding.
    #[serde(default = "SweepConfig::default_value_size_ceiling")]
    pub value_size_ceiling: usize,
    /// Batch size used to repopulate a backend before the read and memory phases.
    #[serde(default = "SweepConfig::default_preload_batch_size")]
    pub preload_batch_size: usize,
    #[serde(default)]
    pub fanout: FanoutMode,
    #[serde(default)]
    pub concurrency: ConcurrencyLimit,
    #[serde(with = "humantime_serde", default)]
    pub op_timeout: Option<Duration>,
    #[serde(default = "SweepConfig::default_backends")]
    pub backends: Vec<BackendKind>,
}

impl SweepConfig {
    fn default_dataset_sizes() -> Vec<usize> {
        vec![1_000, 10_000, 100_000]
    }

    fn default_batch_sizes() -> Vec<usize> {
        vec![100, 1_000]
    }

    fn default_value_size_ceiling() -> usize {
        1_000
    }

    fn default_preload_batch_size() -> usize {
        1_000
    }

    fn default_backends() -> Vec<BackendKind> {
        vec![BackendKind::Redis, BackendKind::Aerospike]
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.dataset_sizes.is_empty() {
            return Err(BenchError::ConfigParsingError(
                "sweep.dataset_sizes must not be empty".to_string(),
            ));
        }
        if self.batch_sizes.is_empty() {
            return Err(BenchError::ConfigParsingError(
                "sweep.batch_sizes must not be empty".to_string(),
            ));
        }
        if self.dataset_sizes.contains(&0) || self.batch_sizes.contains(&0) {
            return Err(BenchError::ConfigParsingError(
                "dataset and batch sizes must be positive".to_string(),
            ));
        }
        if self.preload_batch_size == 0 {
            return Err(BenchError::ConfigParsingError(
                "sweep.preload_batch_size must be positive".to_string(),
            ));
        }
        if self.backends.is_empty() {
            return Err(BenchError::ConfigParsingError(
                "sweep.backends must name at least one backend".to_string(),
            ));
        }
        if let Some(timeout) = self.op_timeout {
            if timeout.is_zero() {
                return Err(BenchError::ConfigParsingError(
                    "sweep.op_timeout must be positive when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            dataset_sizes: Self::default_dataset_sizes(),
            batch_sizes: Self::default_batch_sizes(),
            value_size_ceiling: Self::default_value_size_ceiling(),
            preload_batch_size: Self::default_preload_batch_size(),
            fanout: FanoutMode::default(),
            concurrency: ConcurrencyLimit::default(),
            op_timeout: None,
            backends: Self::default_backends(),
        }
    }
}
