use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::kv::{ToValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FanoutArg {
    Serial,
    Concurrent,
}

#[derive(Parser, Debug, PartialEq)]
#[command(version, about = "Compare Redis and Aerospike under identical workloads")]
pub struct CliArgs {
    /// Path to a TOML config file.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Fan-out discipline inside each phase.
    #[arg(long, value_enum)]
    pub fanout: Option<FanoutArg>,

    /// In-flight cap for concurrent fan-out: a positive integer or "unbounded".
    #[arg(long)]
    pub concurrency: Option<String>,

    /// Also write the result matrix as JSON to this path.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
