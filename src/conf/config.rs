use crate::{
    conf::{AerospikeConfig, FanoutMode, RedisConfig, SweepConfig},
    core::{
        BenchError::{self, ConfigParsingError},
        CliArgs, FanoutArg,
    },
};
use config::{Config as CConfig, ConfigBuilder, Environment, builder::DefaultState};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "KVBENCH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub aerospike: AerospikeConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, BenchError> {
        let builder = CConfig::builder()
            .add_source(config::File::from_str(toml_str, config::FileFormat::Toml));
        Self::build(builder)
    }

    /// Reads the optional TOML file, then overlays `KVBENCH_<SECTION>__<KEY>` variables.
    pub fn load(path: Option<&str>) -> Result<Config, BenchError> {
        Self::load_with_env(path, None)
    }

    fn load_with_env(
        path: Option<&str>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Config, BenchError> {
        let mut builder = CConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Config, BenchError> {
        let config = builder
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        config.sweep.validate()?;
        Ok(config)
    }

    /// Command line flags win over file and environment values.
    pub fn apply_args(&mut self, args: &CliArgs) -> Result<(), BenchError> {
        if let Some(fanout) = args.fanout {
            self.sweep.fanout = match fanout {
                FanoutArg::Serial => FanoutMode::Serial,
                FanoutArg::Concurrent => FanoutMode::Concurrent,
            };
        }
        if let Some(concurrency) = &args.concurrency {
            self.sweep.concurrency = concurrency.parse()?;
        }
        Ok(())
    }
}
