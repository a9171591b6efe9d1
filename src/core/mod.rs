mod args;
mod error;
mod logger;

pub use args::{CliArgs, FanoutArg};
pub use error::BenchError;
pub use logger::setup_logging;
