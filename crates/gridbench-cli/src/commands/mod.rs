use std::path::PathBuf;

use clap::{Args, ValueEnum};
use gridbench_core::errors::{BenchError, ErrorInfo};
use gridbench_exp::{HarnessConfig, ProcessInvoker, Workload};

pub mod measure;
pub mod sweep;

/// Output rendering for both modes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table (sweep) or a bare number (single point).
    Table,
    /// Canonical JSON document.
    Json,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// YAML harness configuration; built-in tables are used when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Workload executable, overriding the configuration.
    #[arg(long)]
    pub workload: Option<PathBuf>,
    /// Trials per sweep point, overriding the configuration.
    #[arg(long)]
    pub trials: Option<u32>,
    /// Kill and discard trials running longer than this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Log filter directive written to stderr, e.g. `info` or `gridbench_exp=debug`.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl CommonArgs {
    /// Loads the configuration file (or defaults), applies overrides and validates.
    pub fn load_config(&self) -> Result<HarnessConfig, BenchError> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };
        if let Some(workload) = &self.workload {
            config.workload = workload.clone();
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if self.timeout_secs.is_some() {
            config.timeout_secs = self.timeout_secs;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Resolves the workload up front so a missing executable aborts before any trial.
pub fn invoker(config: &HarnessConfig) -> Result<ProcessInvoker, BenchError> {
    let workload = Workload::resolve(&config.workload)?;
    Ok(ProcessInvoker::new(workload, config.template()).with_timeout(config.timeout()))
}

pub fn write_error(err: std::io::Error) -> BenchError {
    BenchError::Io(ErrorInfo::new("stdout_write", err.to_string()))
}
