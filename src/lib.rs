pub mod backend;
pub mod conf;
pub mod core;
pub mod measure;
pub mod report;
pub mod scenario;
pub mod workload;

#[cfg(feature = "testutil")]
pub mod testutil;
