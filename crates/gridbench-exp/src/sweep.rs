use std::collections::BTreeSet;

use gridbench_core::errors::{BenchError, ErrorInfo};
use gridbench_core::{ConfigurationPoint, Dimension};

/// Validated, ordered set of dimensions whose Cartesian product is swept.
///
/// The first dimension is the outermost loop and varies slowest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep {
    dimensions: Vec<Dimension>,
}

impl Sweep {
    /// Validates the dimensions and builds a sweep over them.
    ///
    /// Rejects empty or duplicate names, dimensions without values and
    /// repeated values inside a dimension, so every produced point is distinct.
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, BenchError> {
        let mut names = BTreeSet::new();
        for dim in &dimensions {
            if dim.name.trim().is_empty() {
                return Err(BenchError::config(
                    "dimension_name",
                    "dimension names must not be empty",
                ));
            }
            if !names.insert(dim.name.as_str()) {
                return Err(BenchError::Config(
                    ErrorInfo::new("dimension_duplicate", "dimension declared twice")
                        .with_context("dimension", dim.name.clone()),
                ));
            }
            if dim.values.is_empty() {
                return Err(BenchError::Config(
                    ErrorInfo::new("dimension_empty", "dimension has no values")
                        .with_context("dimension", dim.name.clone()),
                ));
            }
            let mut seen = BTreeSet::new();
            for value in &dim.values {
                if !seen.insert(*value) {
                    return Err(BenchError::Config(
                        ErrorInfo::new("dimension_value_duplicate", "dimension repeats a value")
                            .with_context("dimension", dim.name.clone())
                            .with_context("value", value.to_string()),
                    ));
                }
            }
        }
        Ok(Self { dimensions })
    }

    /// Dimensions in nesting order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Looks up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }

    /// Total number of configuration points in the sweep.
    pub fn len(&self) -> usize {
        self.dimensions.iter().map(|dim| dim.values.len()).product()
    }

    /// Returns `true` when the sweep produces no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a fresh pass over the grid. Each call yields the same order.
    pub fn points(&self) -> SweepIter<'_> {
        SweepIter {
            dimensions: &self.dimensions,
            cursor: vec![0; self.dimensions.len()],
            remaining: self.len(),
        }
    }
}

/// Lazy odometer over the grid; the last dimension advances fastest.
#[derive(Debug, Clone)]
pub struct SweepIter<'a> {
    dimensions: &'a [Dimension],
    cursor: Vec<usize>,
    remaining: usize,
}

impl SweepIter<'_> {
    fn current(&self) -> ConfigurationPoint {
        let entries = self
            .dimensions
            .iter()
            .zip(&self.cursor)
            .map(|(dim, idx)| (dim.name.clone(), dim.values[*idx]))
            .collect();
        ConfigurationPoint::new(entries)
    }

    fn advance(&mut self) {
        for axis in (0..self.cursor.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.dimensions[axis].values.len() {
                return;
            }
            self.cursor[axis] = 0;
        }
    }
}

impl Iterator for SweepIter<'_> {
    type Item = ConfigurationPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let point = self.current();
        self.remaining -= 1;
        self.advance();
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SweepIter<'_> {}
