use std::io::{self, Write};

use gridbench_core::errors::{BenchError, ErrorInfo};
use gridbench_core::Dimension;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateResult;
use crate::sweep::Sweep;

/// Which dimensions index table rows and columns. Every other dimension
/// becomes a section key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub rows: Vec<String>,
    pub column: String,
}

/// Fixed-width numeric cell formatting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellFormat {
    /// Divisor applied to the raw mean before printing (1e6 turns ns into ms).
    pub scale: f64,
    pub width: usize,
    pub decimals: usize,
}

impl CellFormat {
    /// Renders one cell; a cell without data is blank padding of the same width.
    pub fn cell(&self, mean: Option<f64>) -> String {
        match mean {
            Some(value) => format!(
                "{:>width$.prec$}",
                value / self.scale,
                width = self.width,
                prec = self.decimals
            ),
            None => " ".repeat(self.width),
        }
    }
}

impl Default for CellFormat {
    fn default() -> Self {
        Self {
            scale: 1e6,
            width: 4,
            decimals: 0,
        }
    }
}

/// One table row: row-dimension values and one optional mean per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub key: Vec<i64>,
    pub cells: Vec<Option<f64>>,
}

/// All rows sharing the same section-dimension values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub key: Vec<(String, i64)>,
    pub rows: Vec<ReportRow>,
}

/// Stateless renderer turning aggregate results into sectioned tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Reporter {
    section_dims: Vec<String>,
    row_dims: Vec<String>,
    column: Dimension,
    format: CellFormat,
}

impl Reporter {
    /// Binds a layout to a sweep.
    ///
    /// The sweep must nest the row dimensions and then the column dimension
    /// innermost, so rows complete one after another while the sweep runs.
    pub fn new(sweep: &Sweep, layout: &TableLayout, format: CellFormat) -> Result<Self, BenchError> {
        let layout_error = |code: &str, message: &str, name: &str| {
            BenchError::Config(
                ErrorInfo::new(code, message).with_context("dimension", name.to_string()),
            )
        };
        if format.width == 0 {
            return Err(BenchError::config("cell_width", "cell width must be positive"));
        }
        if !(format.scale.is_finite() && format.scale > 0.0) {
            return Err(BenchError::config(
                "cell_scale",
                "scale must be a positive finite number",
            ));
        }
        let column = sweep
            .dimension(&layout.column)
            .cloned()
            .ok_or_else(|| layout_error("layout_unknown", "unknown column dimension", &layout.column))?;
        for name in &layout.rows {
            if sweep.dimension(name).is_none() {
                return Err(layout_error("layout_unknown", "unknown row dimension", name));
            }
        }

        let mut tail: Vec<&str> = layout.rows.iter().map(String::as_str).collect();
        tail.push(layout.column.as_str());
        let names: Vec<&str> = sweep.dimensions().iter().map(|dim| dim.name.as_str()).collect();
        if names.len() < tail.len() || names[names.len() - tail.len()..] != tail[..] {
            return Err(BenchError::Config(
                ErrorInfo::new(
                    "layout_order",
                    "row dimensions and then the column dimension must be innermost",
                )
                .with_context("dimensions", names.join(","))
                .with_context("layout", tail.join(",")),
            ));
        }
        let section_dims = names[..names.len() - tail.len()]
            .iter()
            .map(|name| name.to_string())
            .collect();

        Ok(Self {
            section_dims,
            row_dims: layout.rows.clone(),
            column,
            format,
        })
    }

    pub fn format(&self) -> &CellFormat {
        &self.format
    }

    /// Groups results into sections and rows in first-seen order.
    pub fn sections(&self, results: &[AggregateResult]) -> Vec<ReportSection> {
        let mut sections: Vec<ReportSection> = Vec::new();
        for result in results {
            let Some((section_key, row_key, col)) = self.placement(result) else {
                continue;
            };

            let section_idx = match sections.iter().position(|s| s.key == section_key) {
                Some(idx) => idx,
                None => {
                    sections.push(ReportSection {
                        key: section_key,
                        rows: Vec::new(),
                    });
                    sections.len() - 1
                }
            };
            let rows = &mut sections[section_idx].rows;
            let row_idx = match rows.iter().position(|row| row.key == row_key) {
                Some(idx) => idx,
                None => {
                    rows.push(ReportRow {
                        key: row_key,
                        cells: vec![None; self.column.values.len()],
                    });
                    rows.len() - 1
                }
            };
            rows[row_idx].cells[col] = result.mean;
        }
        sections
    }

    /// Renders the full report for a finished sweep.
    pub fn render(&self, results: &[AggregateResult]) -> String {
        let mut out = String::new();
        for section in self.sections(results) {
            out.push_str(&self.section_header(&section.key));
            for row in &section.rows {
                out.push_str(&self.row_line(&row.key, &row.cells));
            }
            out.push_str(SECTION_END);
        }
        out
    }

    /// Section key, row key and column index of a result; `None` when the
    /// point lacks any laid-out dimension or its column value is unknown.
    fn placement(&self, result: &AggregateResult) -> Option<(Vec<(String, i64)>, Vec<i64>, usize)> {
        let value = result.point.get(&self.column.name)?;
        let col = self.column.values.iter().position(|v| *v == value)?;
        let section_key = self
            .section_dims
            .iter()
            .map(|name| result.point.get(name).map(|value| (name.clone(), value)))
            .collect::<Option<Vec<_>>>()?;
        let row_key = result.point.project(&self.row_dims);
        if row_key.len() != self.row_dims.len() {
            return None;
        }
        Some((section_key, row_key, col))
    }

    fn section_header(&self, key: &[(String, i64)]) -> String {
        let mut out = String::new();
        for (name, value) in key {
            out.push_str(&format!("# {name}: {value}\n"));
        }
        if !key.is_empty() {
            out.push('\n');
        }
        let columns: Vec<String> = self
            .column
            .values
            .iter()
            .map(|value| format!("{:>width$}", value, width = self.format.width))
            .collect();
        out.push_str(&format!("{}  {}\n", self.row_dims.join(" "), columns.join(" ")));
        out
    }

    fn row_line(&self, key: &[i64], cells: &[Option<f64>]) -> String {
        let labels: Vec<String> = self
            .row_dims
            .iter()
            .zip(key)
            .map(|(name, value)| format!("{:>width$}", value, width = name.len()))
            .collect();
        let cells: Vec<String> = cells.iter().map(|mean| self.format.cell(*mean)).collect();
        format!("{}  {}\n", labels.join(" "), cells.join(" "))
    }
}

const SECTION_END: &str = "\n\n";

/// Incremental renderer that prints each row as soon as its last column is
/// aggregated. Fed in sweep order it writes exactly what
/// [`Reporter::render`] would produce.
pub struct TableWriter<'r, W: Write> {
    reporter: &'r Reporter,
    out: W,
    section: Option<Vec<(String, i64)>>,
    row: Option<Vec<i64>>,
    cells: Vec<Option<f64>>,
}

impl<'r, W: Write> TableWriter<'r, W> {
    pub fn new(reporter: &'r Reporter, out: W) -> Self {
        Self {
            reporter,
            out,
            section: None,
            row: None,
            cells: Vec::new(),
        }
    }

    /// Records one result, emitting headers and completed rows as they appear.
    pub fn push(&mut self, result: &AggregateResult) -> io::Result<()> {
        let reporter = self.reporter;
        let Some((section_key, row_key, col)) = reporter.placement(result) else {
            return Ok(());
        };

        if self.section.as_ref() != Some(&section_key) {
            self.flush_row()?;
            self.close_section()?;
            self.out
                .write_all(reporter.section_header(&section_key).as_bytes())?;
            self.section = Some(section_key);
        }
        if self.row.as_ref() != Some(&row_key) {
            self.flush_row()?;
            self.row = Some(row_key);
            self.cells = vec![None; reporter.column.values.len()];
        }
        self.cells[col] = result.mean;
        if col + 1 == reporter.column.values.len() {
            self.flush_row()?;
        }
        Ok(())
    }

    /// Flushes any pending row and closes the last section.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_row()?;
        self.close_section()?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn flush_row(&mut self) -> io::Result<()> {
        if let Some(key) = self.row.take() {
            let line = self.reporter.row_line(&key, &self.cells);
            self.out.write_all(line.as_bytes())?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn close_section(&mut self) -> io::Result<()> {
        if self.section.take().is_some() {
            self.out.write_all(SECTION_END.as_bytes())?;
        }
        Ok(())
    }
}
