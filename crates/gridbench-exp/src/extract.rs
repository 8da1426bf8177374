use serde::{Deserialize, Serialize};

use crate::invoke::{Invocation, InvocationOutcome};

/// Why a trial produced no sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidReason {
    NonZeroExit(Option<i32>),
    TimedOut,
    Io(String),
    MissingLine,
    MissingToken,
    Unparseable(String),
}

/// Outcome of one trial after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialResult {
    Valid(f64),
    Invalid(InvalidReason),
}

impl TrialResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, TrialResult::Valid(_))
    }

    pub fn sample(&self) -> Option<f64> {
        match self {
            TrialResult::Valid(sample) => Some(*sample),
            TrialResult::Invalid(_) => None,
        }
    }
}

/// Reads one whitespace token from one output line as the trial sample.
///
/// The sample is returned unscaled; unit conversion belongs to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleExtractor {
    /// Zero-based output line index.
    #[serde(default)]
    pub line: usize,
    /// Zero-based whitespace token index within the line.
    #[serde(default = "SampleExtractor::default_token")]
    pub token: usize,
}

impl SampleExtractor {
    const fn default_token() -> usize {
        1
    }

    pub fn new(line: usize, token: usize) -> Self {
        Self { line, token }
    }

    /// Classifies a finished invocation as a sample or an invalid trial.
    pub fn extract(&self, invocation: &Invocation) -> TrialResult {
        match &invocation.outcome {
            InvocationOutcome::Exited(0) => self.parse(&invocation.stdout),
            InvocationOutcome::Exited(code) => {
                TrialResult::Invalid(InvalidReason::NonZeroExit(Some(*code)))
            }
            InvocationOutcome::Signaled => TrialResult::Invalid(InvalidReason::NonZeroExit(None)),
            InvocationOutcome::TimedOut => TrialResult::Invalid(InvalidReason::TimedOut),
            InvocationOutcome::IoError(err) => TrialResult::Invalid(InvalidReason::Io(err.clone())),
        }
    }

    /// Parses the designated token out of captured standard output.
    pub fn parse(&self, stdout: &str) -> TrialResult {
        let Some(line) = stdout.lines().nth(self.line) else {
            return TrialResult::Invalid(InvalidReason::MissingLine);
        };
        let Some(token) = line.split_ascii_whitespace().nth(self.token) else {
            return TrialResult::Invalid(InvalidReason::MissingToken);
        };
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => TrialResult::Valid(value),
            _ => TrialResult::Invalid(InvalidReason::Unparseable(token.to_string())),
        }
    }
}

impl Default for SampleExtractor {
    fn default() -> Self {
        Self {
            line: 0,
            token: Self::default_token(),
        }
    }
}
