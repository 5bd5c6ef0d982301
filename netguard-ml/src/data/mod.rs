//! Data engineering: loading, schema checks, drift detection.

pub mod drift;
pub mod schema;
pub mod source;

pub use drift::{ColumnDrift, DriftReport, KolmogorovSmirnovTest, detect_dataset_drift};
pub use schema::{ColumnSchema, ColumnType, SchemaDefinition};
pub use source::{CsvSource, DataBatch, DataSource, DataSourceInfo, write_csv};
