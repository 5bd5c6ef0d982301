//! Schema definition and column type inference.
//!
//! The schema file is YAML:
//!
//! ```yaml
//! columns:
//!   - having_IP_Address: int64
//!   - Result: int64
//! numerical_columns:
//!   - having_IP_Address
//!   - Result
//! ```

use crate::error::{PipelineError, Result};
use crate::persistence::load_yaml;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Unknown,
}

impl ColumnType {
    /// Map a declared dtype (`int64`, `float32`, `object`, ...) to a column type.
    pub fn from_dtype(dtype: &str) -> Self {
        let dtype = dtype.trim().to_ascii_lowercase();
        if dtype.starts_with("int") || dtype.starts_with("uint") {
            Self::Integer
        } else if dtype.starts_with("float") || dtype == "double" {
            Self::Float
        } else if dtype.starts_with("bool") {
            Self::Boolean
        } else if dtype == "object" || dtype == "str" || dtype == "string" {
            Self::String
        } else {
            Self::Unknown
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
}

/// Expected shape of the ingested data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnSchema>,
    /// Columns that must hold only numbers or missing values.
    pub numerical_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    columns: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    numerical_columns: Vec<String>,
}

impl SchemaDefinition {
    /// Read a schema YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let file: SchemaFile = load_yaml(path)?;
        let mut columns = Vec::with_capacity(file.columns.len());
        for entry in file.columns {
            if entry.len() != 1 {
                return Err(PipelineError::config(format!(
                    "schema {}: each column entry must map one name to one dtype",
                    path.display()
                )));
            }
            for (name, dtype) in entry {
                columns.push(ColumnSchema {
                    dtype: ColumnType::from_dtype(&dtype),
                    name,
                });
            }
        }
        let schema = Self {
            columns,
            numerical_columns: file.numerical_columns,
        };
        if let Some(unknown) = schema
            .numerical_columns
            .iter()
            .find(|n| !schema.columns.iter().any(|c| &c.name == *n))
        {
            return Err(PipelineError::config(format!(
                "schema {}: numerical column '{unknown}' is not declared in columns",
                path.display()
            )));
        }
        Ok(schema)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns whose content must be numeric: the declared numerical columns plus
    /// any column with a numeric dtype.
    pub fn numeric_column_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.numerical_columns
            .iter()
            .map(String::as_str)
            .chain(
                self.columns
                    .iter()
                    .filter(|c| c.dtype.is_numeric())
                    .map(|c| c.name.as_str()),
            )
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Structural check: same column count and the same set of names.
    pub fn check_columns(&self, actual: &[String]) -> std::result::Result<(), String> {
        if actual.len() != self.columns.len() {
            return Err(format!(
                "expected {} columns, found {}",
                self.columns.len(),
                actual.len()
            ));
        }
        let present: HashSet<&str> = actual.iter().map(String::as_str).collect();
        let missing: Vec<&str> = self
            .column_names()
            .into_iter()
            .filter(|name| !present.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing required columns: {}", missing.join(", ")));
        }
        Ok(())
    }
}

/// Infer column type from a sample of values.
pub fn infer_column_type(values: &[serde_json::Value]) -> ColumnType {
    let non_null: Vec<_> = values.iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return ColumnType::Null;
    }

    let mut has_int = false;
    let mut has_float = false;
    let mut has_bool = false;
    let mut has_string = false;

    for v in &non_null {
        match v {
            serde_json::Value::Number(n) => {
                if n.is_f64() {
                    has_float = true;
                } else {
                    has_int = true;
                }
            }
            serde_json::Value::Bool(_) => has_bool = true,
            serde_json::Value::String(_) => has_string = true,
            _ => {}
        }
    }

    if has_string {
        return ColumnType::String;
    }
    if has_float {
        return ColumnType::Float;
    }
    if has_int {
        return ColumnType::Integer;
    }
    if has_bool {
        return ColumnType::Boolean;
    }
    ColumnType::Unknown
}
