//! In-memory tabular dataset loaded once at startup.
//!
//! The dataset is a headed CSV file held as raw string records. It is never
//! mutated after loading, so a single instance is shared across requests
//! behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use thiserror::Error;
use tracing::info;

/// Most frequent values reported per text column in a summary.
const TOP_VALUES: usize = 5;

/// Errors from loading or querying the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("column '{0}' not found in dataset")]
    MissingColumn(String),

    #[error("column '{0}' has no numeric values")]
    EmptyColumn(String),
}

/// A read-only table of string cells with a header row.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<StringRecord>,
}

impl Dataset {
    /// Load a headed CSV file from disk.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|source| DatasetError::Load {
                path: path.display().to_string(),
                source,
            })?;
        let dataset = Self::from_csv_reader(reader)?;
        info!(
            path = %path.display(),
            rows = dataset.row_count(),
            columns = dataset.columns.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Build a dataset from any CSV source (used for in-memory data).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Self::from_csv_reader(reader)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DatasetError> {
        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Trimmed cell at `(row, column)`; `None` when empty or absent.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
    }

    /// Numeric values of a column with empty and unparseable cells dropped.
    ///
    /// Fails if the column does not exist or if nothing numeric is left.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;

        let values: Vec<f64> = self.cells(idx).filter_map(parse_number).collect();

        if values.is_empty() {
            return Err(DatasetError::EmptyColumn(name.to_string()));
        }
        Ok(values)
    }

    /// Profile every column.
    pub fn summary(&self) -> DatasetSummary {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| self.profile_column(idx, name))
            .collect();
        DatasetSummary {
            row_count: self.rows.len(),
            columns,
        }
    }

    /// Header plus the first `n` rows, re-encoded as CSV text.
    pub fn sample_csv(&self, n: usize) -> Result<String, DatasetError> {
        self.rows_csv(0..n.min(self.rows.len()))
    }

    /// Header plus the rows at `indices`, re-encoded as CSV text.
    /// Out-of-range indices are skipped.
    pub fn rows_csv<I>(&self, indices: I) -> Result<String, DatasetError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in indices.into_iter().filter_map(|i| self.rows.get(i)) {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DatasetError::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Non-empty cells of a column; short rows count as missing.
    fn cells(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .filter_map(move |row| row.get(idx))
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
    }

    fn profile_column(&self, idx: usize, name: &str) -> ColumnProfile {
        let cells: Vec<&str> = self.cells(idx).collect();
        let non_null = cells.len();
        let numbers: Vec<f64> = cells.iter().copied().filter_map(parse_number).collect();

        let kind = if !numbers.is_empty() && numbers.len() == non_null {
            let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
            let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
            ColumnKind::Numeric { min, max, mean }
        } else {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for cell in &cells {
                *counts.entry(*cell).or_default() += 1;
            }
            let distinct = counts.len();
            let mut top: Vec<(String, usize)> = counts
                .into_iter()
                .map(|(value, count)| (value.to_string(), count))
                .collect();
            top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            top.truncate(TOP_VALUES);
            ColumnKind::Text { distinct, top }
        };

        ColumnProfile {
            name: name.to_string(),
            non_null,
            kind,
        }
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Summary
// =============================================================================

/// Per-column profile of the whole dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub columns: Vec<ColumnProfile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    /// Rows with a non-empty cell in this column.
    pub non_null: usize,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Numeric { min: f64, max: f64, mean: f64 },
    Text {
        distinct: usize,
        /// Most frequent values with their counts, most frequent first.
        top: Vec<(String, usize)>,
    },
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows: {}", self.row_count)?;
        writeln!(f, "columns:")?;
        for col in &self.columns {
            match &col.kind {
                ColumnKind::Numeric { min, max, mean } => writeln!(
                    f,
                    "- {} (numeric, {} non-null): min {}, max {}, mean {}",
                    col.name,
                    col.non_null,
                    format_number(*min),
                    format_number(*max),
                    format_number(*mean),
                )?,
                ColumnKind::Text { distinct, top } => {
                    let top = top
                        .iter()
                        .map(|(value, count)| format!("\"{}\" ({})", value, count))
                        .collect::<Vec<_>>()
                        .join(", ");
                    writeln!(
                        f,
                        "- {} (text, {} non-null, {} distinct): most frequent {}",
                        col.name, col.non_null, distinct, top
                    )?
                }
            }
        }
        Ok(())
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}
