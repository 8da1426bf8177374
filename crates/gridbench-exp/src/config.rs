use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gridbench_core::errors::{BenchError, ErrorInfo};
use gridbench_core::{ConfigurationPoint, Constant, Dimension};
use serde::{Deserialize, Serialize};

use crate::extract::SampleExtractor;
use crate::invoke::{ArgTemplate, FlagBinding};
use crate::report::{CellFormat, Reporter, TableLayout};
use crate::serde::from_yaml_slice;
use crate::sweep::Sweep;

/// Complete harness configuration. Every field has a built-in default, so an
/// empty YAML document describes the stock messaging sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub workload: PathBuf,
    pub dimensions: Vec<Dimension>,
    pub constants: Vec<Constant>,
    pub flags: Vec<FlagBinding>,
    pub trials: u32,
    pub extract: SampleExtractor,
    pub layout: TableLayout,
    pub format: CellFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Parameters for single-point measurement mode.
    pub point: BTreeMap<String, i64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workload: PathBuf::from("./messaging"),
            dimensions: vec![
                Dimension::new("users", vec![1, 2, 5, 10, 20, 50, 100]),
                Dimension::new("channels", vec![5, 10, 20, 50, 100]),
                Dimension::new("messages", vec![500]),
                Dimension::new("requests", vec![1, 2, 5, 10, 20, 50, 100, 200, 500, 1000]),
                Dimension::new("ratio", vec![1, 10]),
                Dimension::new("cpus", (2..=12).collect::<Vec<i64>>()),
            ],
            constants: vec![Constant {
                name: "level".into(),
                value: 5,
            }],
            flags: vec![
                FlagBinding::new("users", "-n"),
                FlagBinding::new("channels", "-k"),
                FlagBinding::new("messages", "-m"),
                FlagBinding::new("requests", "-t"),
                FlagBinding::new("ratio", "-r"),
                FlagBinding::new("cpus", "-ll:cpu"),
                FlagBinding::new("level", "-level"),
            ],
            trials: 30,
            extract: SampleExtractor::default(),
            layout: TableLayout {
                rows: vec!["requests".into(), "ratio".into()],
                column: "cpus".into(),
            },
            format: CellFormat::default(),
            timeout_secs: None,
            point: BTreeMap::from([
                ("users".to_string(), 1),
                ("channels".to_string(), 5),
                ("messages".to_string(), 1000),
                ("requests".to_string(), 1000),
                ("ratio".to_string(), 1),
                ("cpus".to_string(), 2),
            ]),
        }
    }
}

impl HarnessConfig {
    /// Loads a YAML configuration and validates it.
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let bytes = fs::read(path).map_err(|err| {
            BenchError::Io(
                ErrorInfo::new("config_read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let config: Self = from_yaml_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked without touching the workload.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.trials == 0 {
            return Err(BenchError::config("trials", "trial count must be at least 1"));
        }
        if self.timeout_secs == Some(0) {
            return Err(BenchError::config("timeout", "timeout must be at least 1 second"));
        }
        if self.dimensions.is_empty() {
            return Err(BenchError::config("dimensions", "at least one dimension is required"));
        }
        let sweep = self.sweep()?;
        let template = self.template();
        let mut seen = BTreeSet::new();
        for binding in &self.flags {
            if !seen.insert(binding.param.as_str()) {
                return Err(unbound("flag_duplicate", "parameter has two flags", &binding.param));
            }
        }
        for dim in sweep.dimensions() {
            if !template.covers(&dim.name) {
                return Err(unbound("flag_missing", "dimension has no flag binding", &dim.name));
            }
        }
        for constant in &self.constants {
            if !template.covers(&constant.name) {
                return Err(unbound("flag_missing", "constant has no flag binding", &constant.name));
            }
            if sweep.dimension(&constant.name).is_some() {
                return Err(unbound(
                    "constant_shadows_dimension",
                    "constant repeats a swept dimension",
                    &constant.name,
                ));
            }
        }
        for name in self.point.keys() {
            if !template.covers(name) {
                return Err(unbound("flag_missing", "point parameter has no flag binding", name));
            }
        }
        self.reporter()?;
        Ok(())
    }

    pub fn sweep(&self) -> Result<Sweep, BenchError> {
        Sweep::new(self.dimensions.clone())
    }

    pub fn template(&self) -> ArgTemplate {
        ArgTemplate::new(self.flags.clone(), self.constants.clone())
    }

    pub fn reporter(&self) -> Result<Reporter, BenchError> {
        Reporter::new(&self.sweep()?, &self.layout, self.format)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The single measurement point, ordered by flag declaration.
    pub fn measure_point(&self) -> ConfigurationPoint {
        let entries = self
            .flags
            .iter()
            .filter_map(|binding| {
                self.point
                    .get(&binding.param)
                    .map(|value| (binding.param.clone(), *value))
            })
            .collect();
        ConfigurationPoint::new(entries)
    }
}

fn unbound(code: &str, message: &str, name: &str) -> BenchError {
    BenchError::Config(ErrorInfo::new(code, message).with_context("parameter", name.to_string()))
}
