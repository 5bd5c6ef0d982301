//! Tabular data sources and the in-memory batch every stage works on.

use crate::constants::MISSING_VALUE_PLACEHOLDERS;
use crate::error::{PipelineError, Result};
use crate::persistence::atomic_write;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A batch of data rows. Missing cells are `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl DataBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, idx: usize) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or(serde_json::Value::Null))
            .collect()
    }

    /// Non-missing numeric values of one column. Strings are skipped.
    pub fn numeric_values(&self, idx: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(serde_json::Value::as_f64))
            .collect()
    }

    /// New batch holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> DataBatch {
        DataBatch {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Dense matrix of the named columns; missing cells become `NaN`.
    ///
    /// Fails with an invalid-data error on any non-numeric cell.
    pub fn to_matrix(&self, columns: &[String]) -> Result<Array2<f64>> {
        let indices = columns
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| {
                    PipelineError::schema_validation(format!("column '{name}' not found"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut matrix = Array2::from_elem((self.row_count(), indices.len()), f64::NAN);
        for (r, row) in self.rows.iter().enumerate() {
            for (c, &idx) in indices.iter().enumerate() {
                match row.get(idx) {
                    None | Some(serde_json::Value::Null) => {}
                    Some(value) => {
                        matrix[[r, c]] = value.as_f64().ok_or_else(|| {
                            PipelineError::invalid_data(format!(
                                "non-numeric value {value} in column '{}' at row {r}",
                                self.columns[idx]
                            ))
                        })?;
                    }
                }
            }
        }
        Ok(matrix)
    }
}

/// Information about a data source for logging and lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for loading a batch from somewhere.
pub trait DataSource {
    fn load(&self) -> Result<DataBatch>;

    fn source_info(&self) -> DataSourceInfo;
}

/// CSV file with a header row.
///
/// Cells matching a missing-value placeholder (see
/// [`MISSING_VALUE_PLACEHOLDERS`]) or parsing to a non-finite float load as
/// `Null`. Integers and finite floats load as numbers; everything else stays a
/// string.
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<DataBatch> {
        if !self.path.is_file() {
            return Err(PipelineError::data_source(format!(
                "CSV file not found at: {}",
                self.path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| {
                PipelineError::data_source(format!("cannot open {}: {e}", self.path.display()))
            })?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| {
                PipelineError::data_source(format!(
                    "cannot read header of {}: {e}",
                    self.path.display()
                ))
            })?
            .iter()
            .map(|h| h.trim_matches('"').to_string())
            .collect();
        if columns.is_empty() || columns.iter().all(String::is_empty) {
            return Err(PipelineError::data_source(format!(
                "empty CSV file: {}",
                self.path.display()
            )));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                PipelineError::data_source(format!("malformed row in {}: {e}", self.path.display()))
            })?;
            rows.push(record.iter().map(parse_cell).collect());
        }

        Ok(DataBatch { columns, rows })
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
        }
    }
}

fn parse_cell(raw: &str) -> serde_json::Value {
    let s = raw.trim();
    if MISSING_VALUE_PLACEHOLDERS.contains(&s) {
        return serde_json::Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return serde_json::Value::Number(i.into());
    }
    if let Ok(f) = s.parse::<f64>() {
        return serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number);
    }
    serde_json::Value::String(s.to_string())
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write a batch as CSV with a header row. Missing cells are written empty.
pub fn write_csv(batch: &DataBatch, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&batch.columns)?;
    for row in &batch.rows {
        writer.write_record(row.iter().map(render_cell))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::new(crate::ErrorKind::Io(e.into_error())))?;
    atomic_write(path, &bytes)
}
