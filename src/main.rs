use anyhow::{Context, bail};
use clap::Parser;
use log::{info, warn};

use kvbench::backend::{self, Backends};
use kvbench::conf::Config;
use kvbench::core::{CliArgs, setup_logging};
use kvbench::report;
use kvbench::scenario::{ResultMatrix, ScenarioRunner};

fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "kvbench started");

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_args(&args)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start tokio runtime")?;
    let matrix = runtime.block_on(run(&config))?;

    println!("{}", report::render(&matrix));
    if let Some(path) = &args.json {
        report::write_json(&matrix, path)?;
        info!("result matrix written to {}", path.display());
    }
    Ok(())
}

async fn run(config: &Config) -> anyhow::Result<ResultMatrix> {
    let adapters = config
        .sweep
        .backends
        .iter()
        .map(|kind| backend::build(*kind, config))
        .collect();
    let backends = Backends::connect(adapters).await?;
    info!("{} backend(s) ready", backends.len());

    let outcome = tokio::select! {
        matrix = ScenarioRunner::new(&backends, &config.sweep).run() => Some(matrix),
        _ = tokio::signal::ctrl_c() => None,
    };
    backends.close().await;

    match outcome {
        Some(matrix) => Ok(matrix?),
        None => {
            warn!("interrupted, sweep abandoned");
            bail!("interrupted")
        }
    }
}
