//! Parametric benchmark harness: sweeps a configuration grid, runs an
//! external workload for every point and reports aggregated samples.

mod aggregate;
mod config;
mod extract;
mod harness;
mod hash;
mod invoke;
mod report;
mod serde;
mod sweep;

pub use aggregate::{run_trials, AggregateResult};
pub use config::HarnessConfig;
pub use extract::{InvalidReason, SampleExtractor, TrialResult};
pub use harness::{Harness, SweepOutcome, SweepReport};
pub use hash::stable_hash_string;
pub use invoke::{
    ArgTemplate, FlagBinding, Invocation, InvocationOutcome, Invoke, ProcessInvoker, Workload,
};
pub use report::{CellFormat, ReportRow, ReportSection, Reporter, TableLayout, TableWriter};
pub use sweep::{Sweep, SweepIter};

pub use crate::serde::{from_yaml_slice, to_canonical_json_bytes};
