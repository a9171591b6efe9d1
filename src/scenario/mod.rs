mod fanout;
mod matrix;
mod runner;

pub use fanout::{Fanout, fan_out, with_timeout};
pub use matrix::{BackendOutcome, MatrixEntry, MatrixKey, Outcome, ResultMatrix};
pub use runner::ScenarioRunner;
