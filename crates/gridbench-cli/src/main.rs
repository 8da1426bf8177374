use std::error::Error;

use clap::Parser;
use commands::{measure, sweep, CommonArgs};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "gridbench",
    version,
    about = "Sweep a workload across a parameter grid and tabulate mean samples"
)]
struct Cli {
    /// Trial count for single-point mode. Without it the full sweep runs.
    #[arg(value_name = "TRIALS")]
    measure_trials: Option<u32>,
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.common.log_level)?;
    let config = cli.common.load_config()?;
    debug!(workload = %config.workload.display(), "configuration loaded");
    match cli.measure_trials {
        Some(trials) => measure::run(&config, trials, cli.common.format),
        None => sweep::run(&config, cli.common.format),
    }
}

/// Logs go to stderr so stdout carries only results.
fn init_logging(level: &str) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_new(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
