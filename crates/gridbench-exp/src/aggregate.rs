use gridbench_core::{BenchError, ConfigurationPoint};
use serde::Serialize;
use tracing::{debug, warn};

use crate::extract::{SampleExtractor, TrialResult};
use crate::invoke::Invoke;

/// Reduction of the valid samples observed for one configuration point.
///
/// `mean` is `None` when no trial produced a sample; that cell has no data
/// and must never be read as a zero measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub point: ConfigurationPoint,
    pub attempted: u32,
    pub valid: u32,
    pub mean: Option<f64>,
}

impl AggregateResult {
    /// Reduces already-extracted trials for `point`.
    pub fn from_trials<'a>(
        point: ConfigurationPoint,
        trials: impl IntoIterator<Item = &'a TrialResult>,
    ) -> Self {
        let mut attempted = 0u32;
        let mut valid = 0u32;
        let mut sum = 0.0f64;
        for trial in trials {
            attempted += 1;
            if let Some(sample) = trial.sample() {
                valid += 1;
                sum += sample;
            }
        }
        let mean = (valid > 0).then(|| sum / f64::from(valid));
        Self {
            point,
            attempted,
            valid,
            mean,
        }
    }

    pub fn failed(&self) -> u32 {
        self.attempted - self.valid
    }

    pub fn has_data(&self) -> bool {
        self.mean.is_some()
    }
}

/// Runs `trials` sequential invocations of `point` and aggregates them.
///
/// A failed trial is logged and dropped; it never stops the remaining trials.
pub fn run_trials<I: Invoke + ?Sized>(
    invoker: &I,
    extractor: &SampleExtractor,
    point: &ConfigurationPoint,
    trials: u32,
) -> Result<AggregateResult, BenchError> {
    if trials == 0 {
        return Err(BenchError::config(
            "trials",
            "trial count must be at least 1",
        ));
    }
    let mut results = Vec::with_capacity(trials as usize);
    for trial in 0..trials {
        let invocation = invoker.invoke(point);
        let result = extractor.extract(&invocation);
        match &result {
            TrialResult::Valid(sample) => debug!(trial, sample, "trial completed"),
            TrialResult::Invalid(reason) => {
                warn!(trial, point = ?point, reason = ?reason, "trial failed")
            }
        }
        results.push(result);
    }
    Ok(AggregateResult::from_trials(point.clone(), &results))
}
