use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use crate::core::BenchError;
use crate::measure::{BenchmarkResult, Operation};

/// One sweep point. `batch_size` is set only for batched phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MatrixKey {
    pub dataset_size: usize,
    pub batch_size: Option<usize>,
    pub operation: Operation,
}

impl MatrixKey {
    pub fn new(dataset_size: usize, batch_size: Option<usize>, operation: Operation) -> Self {
        Self {
            dataset_size,
            batch_size,
            operation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Completed(BenchmarkResult),
    Failed { reason: String },
}

impl Outcome {
    pub fn failed(err: &BenchError) -> Self {
        Outcome::Failed {
            reason: err.to_string(),
        }
    }

    pub fn result(&self) -> Option<&BenchmarkResult> {
        match self {
            Outcome::Completed(result) => Some(result),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl From<Result<BenchmarkResult, BenchError>> for Outcome {
    fn from(result: Result<BenchmarkResult, BenchError>) -> Self {
        match result {
            Ok(result) => Outcome::Completed(result),
            Err(err) => Outcome::failed(&err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendOutcome {
    pub backend: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixEntry {
    #[serde(flatten)]
    pub key: MatrixKey,
    pub outcomes: Vec<BackendOutcome>,
}

/// Results of a run in sweep order, one outcome per backend per key.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ResultMatrix {
    entries: Vec<MatrixEntry>,
    #[serde(skip)]
    index: HashMap<MatrixKey, usize>,
}

impl ResultMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `outcome` for `backend` under `key`, replacing an earlier one for the same pair.
    pub fn record(&mut self, key: MatrixKey, backend: &str, outcome: Outcome) {
        let position = *self.index.entry(key).or_insert_with(|| {
            self.entries.push(MatrixEntry {
                key,
                outcomes: Vec::new(),
            });
            self.entries.len() - 1
        });
        let entry = &mut self.entries[position];
        match entry.outcomes.iter_mut().find(|o| o.backend == backend) {
            Some(existing) => {
                warn!("replacing {backend} outcome for {key:?}");
                existing.outcome = outcome;
            }
            None => entry.outcomes.push(BackendOutcome {
                backend: backend.to_string(),
                outcome,
            }),
        }
    }

    pub fn get(&self, key: &MatrixKey) -> Option<&MatrixEntry> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    pub fn outcome(&self, key: &MatrixKey, backend: &str) -> Option<&Outcome> {
        self.get(key)?
            .outcomes
            .iter()
            .find(|o| o.backend == backend)
            .map(|o| &o.outcome)
    }

    pub fn entries(&self) -> &[MatrixEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|entry| entry.outcomes.iter())
            .filter(|o| o.outcome.is_failed())
            .count()
    }
}
