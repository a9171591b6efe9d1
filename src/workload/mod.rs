mod generator;

pub use generator::{Dataset, TestItem, WorkloadGenerator, batches};
