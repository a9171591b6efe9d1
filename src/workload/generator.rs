use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::core::BenchError;

/// One key/value pair written to every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestItem {
    pub key: String,
    pub value: String,
}

pub type Dataset = Vec<TestItem>;

/// Produces datasets with sequential keys and randomly padded values.
///
/// Values are `value-<i>-<padding>`, where padding is `x` repeated a uniform
/// count in `[0, value_size_ceiling)`, so write sizes vary inside one dataset.
pub struct WorkloadGenerator {
    rng: StdRng,
    value_size_ceiling: usize,
}

impl WorkloadGenerator {
    pub fn new(value_size_ceiling: usize) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            value_size_ceiling,
        }
    }

    pub fn with_seed(value_size_ceiling: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            value_size_ceiling,
        }
    }

    pub fn generate(&mut self, size: usize) -> Result<Dataset, BenchError> {
        if size == 0 {
            return Err(BenchError::MeasurementError(
                "cannot generate an empty dataset".to_string(),
            ));
        }
        let dataset = (0..size)
            .map(|i| {
                let padding = if self.value_size_ceiling == 0 {
                    0
                } else {
                    self.rng.gen_range(0..self.value_size_ceiling)
                };
                TestItem {
                    key: format!("key-{i}"),
                    value: format!("value-{i}-{}", "x".repeat(padding)),
                }
            })
            .collect();
        Ok(dataset)
    }
}

/// Splits `items` into contiguous batches; the last one may be short.
pub fn batches(items: &[TestItem], batch_size: usize) -> Result<Vec<&[TestItem]>, BenchError> {
    if batch_size == 0 {
        return Err(BenchError::MeasurementError(
            "batch size must be positive".to_string(),
        ));
    }
    Ok(items.chunks(batch_size).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::*;

    #[test]
    fn test_generate_exact_size_unique_keys() {
        let mut generator = WorkloadGenerator::with_seed(1000, 7);
        let dataset = generator.generate(2500).unwrap();
        assert_eq!(dataset.len(), 2500);

        let keys: HashSet<&str> = dataset.iter().map(|item| item.key.as_str()).collect();
        assert_eq!(keys.len(), 2500);
        assert_eq!(dataset[0].key, "key-0");
        assert_eq!(dataset[2499].key, "key-2499");
    }

    #[test]
    fn test_value_shape_and_padding_bound() {
        let mut generator = WorkloadGenerator::with_seed(50, 11);
        let dataset = generator.generate(500).unwrap();
        for (i, item) in dataset.iter().enumerate() {
            let prefix = format!("value-{i}-");
            let padding = item.value.strip_prefix(&prefix).unwrap();
            assert!(padding.len() < 50);
            assert!(padding.chars().all(|c| c == 'x'));
        }
    }

    #[test]
    fn test_zero_ceiling_means_no_padding() {
        let mut generator = WorkloadGenerator::with_seed(0, 3);
        let dataset = generator.generate(3).unwrap();
        assert_eq!(dataset[2].value, "value-2-");
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let a = WorkloadGenerator::with_seed(1000, 42).generate(100).unwrap();
        let b = WorkloadGenerator::with_seed(1000, 42).generate(100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_rejects_empty() {
        let mut generator = WorkloadGenerator::new(1000);
        assert!(matches!(
            generator.generate(0),
            Err(BenchError::MeasurementError(_))
        ));
    }

    #[rstest]
    #[case::uneven(2500, 1000, vec![1000, 1000, 500])]
    #[case::even(1000, 100, vec![100; 10])]
    #[case::single_short(5, 10, vec![5])]
    #[case::one_per_batch(3, 1, vec![1, 1, 1])]
    fn test_batches_partition(
        #[case] size: usize,
        #[case] batch_size: usize,
        #[case] expected: Vec<usize>,
    ) {
        let dataset = WorkloadGenerator::with_seed(10, 1).generate(size).unwrap();
        let parts = batches(&dataset, batch_size).unwrap();
        let lengths: Vec<usize> = parts.iter().map(|batch| batch.len()).collect();
        assert_eq!(lengths, expected);
        assert_eq!(parts.last().unwrap().last().unwrap().key, format!("key-{}", size - 1));
    }

    #[test]
    fn test_batches_rejects_zero_batch_size() {
        let dataset = WorkloadGenerator::with_seed(10, 1).generate(3).unwrap();
        assert!(batches(&dataset, 0).is_err());
    }
}
