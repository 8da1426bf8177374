use gridbench_core::{BenchError, ConfigurationPoint};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{run_trials, AggregateResult};
use crate::config::HarnessConfig;
use crate::extract::SampleExtractor;
use crate::hash::stable_hash_string;
use crate::invoke::Invoke;
use crate::sweep::Sweep;

/// Sequential driver: one trial at a time, one point at a time.
#[derive(Debug, Clone)]
pub struct Harness<I> {
    invoker: I,
    extractor: SampleExtractor,
    trials: u32,
}

/// Every aggregate of a finished sweep plus failed-trial totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub results: Vec<AggregateResult>,
    pub total_trials: u64,
    pub failed_trials: u64,
}

impl<I: Invoke> Harness<I> {
    pub fn new(invoker: I, extractor: SampleExtractor, trials: u32) -> Self {
        Self {
            invoker,
            extractor,
            trials,
        }
    }

    /// Single-point mode: aggregates `trials` runs of one point.
    pub fn measure(&self, point: &ConfigurationPoint) -> Result<AggregateResult, BenchError> {
        info!(point = ?point, trials = self.trials, "measuring single point");
        run_trials(&self.invoker, &self.extractor, point, self.trials)
    }

    /// Walks the sweep in order, handing each aggregate to `on_result` as soon
    /// as it is available.
    pub fn run_sweep<F>(&self, sweep: &Sweep, mut on_result: F) -> Result<SweepOutcome, BenchError>
    where
        F: FnMut(&AggregateResult) -> Result<(), BenchError>,
    {
        info!(points = sweep.len(), trials = self.trials, "starting sweep");
        let mut results = Vec::with_capacity(sweep.len());
        let mut total_trials = 0u64;
        let mut failed_trials = 0u64;
        for point in sweep.points() {
            let result = run_trials(&self.invoker, &self.extractor, &point, self.trials)?;
            total_trials += u64::from(result.attempted);
            failed_trials += u64::from(result.failed());
            on_result(&result)?;
            results.push(result);
        }
        info!(total_trials, failed_trials, "sweep finished");
        Ok(SweepOutcome {
            results,
            total_trials,
            failed_trials,
        })
    }
}

/// Structured sweep output for `--format json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub plan_hash: String,
    pub trials: u32,
    pub total_trials: u64,
    pub failed_trials: u64,
    pub results: Vec<AggregateResult>,
}

impl SweepReport {
    pub fn new(config: &HarnessConfig, outcome: SweepOutcome) -> Result<Self, BenchError> {
        Ok(Self {
            plan_hash: stable_hash_string(config)?,
            trials: config.trials,
            total_trials: outcome.total_trials,
            failed_trials: outcome.failed_trials,
            results: outcome.results,
        })
    }
}
