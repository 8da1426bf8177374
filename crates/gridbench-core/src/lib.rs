#![deny(missing_docs)]
#![doc = "Core data model and error types for the gridbench harness."]

pub mod errors;
mod types;

pub use errors::{BenchError, ErrorInfo};
pub use types::{ConfigurationPoint, Constant, Dimension};
