//! Validation: schema check (fatal), content check, and drift report (advisory).

use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::config::DataValidationConfig;
use crate::data::schema::infer_column_type;
use crate::data::{
    ColumnType, CsvSource, DataBatch, DataSource, DriftReport, KolmogorovSmirnovTest,
    SchemaDefinition, detect_dataset_drift, write_csv,
};
use crate::error::{PipelineError, Result};
use crate::persistence::atomic_write_yaml;
use serde_json::Value;

pub struct DataValidation {
    ingestion_artifact: DataIngestionArtifact,
    config: DataValidationConfig,
    schema: SchemaDefinition,
}

impl DataValidation {
    pub fn new(
        ingestion_artifact: DataIngestionArtifact,
        config: DataValidationConfig,
    ) -> Result<Self> {
        let schema = SchemaDefinition::load(&config.schema_path)?;
        Ok(Self {
            ingestion_artifact,
            config,
            schema,
        })
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn read_data(path: &std::path::Path) -> Result<DataBatch> {
        CsvSource::new(path).load()
    }

    /// Column count and names must match the schema.
    pub fn validate_number_of_columns(&self, batch: &DataBatch, split: &str) -> Result<()> {
        tracing::debug!(
            split,
            expected = self.schema.columns.len(),
            actual = batch.column_count(),
            "Checking columns"
        );
        self.schema
            .check_columns(&batch.columns)
            .map_err(|msg| PipelineError::schema_validation(format!("{split} split: {msg}")))
    }

    /// Cells in numeric columns that are neither numbers nor missing.
    pub fn non_numeric_cells(&self, batch: &DataBatch) -> Vec<String> {
        let mut problems = Vec::new();
        for name in self.schema.numeric_column_names() {
            let Some(idx) = batch.column_index(name) else {
                continue;
            };
            let values = batch.column_values(idx);
            let inferred = infer_column_type(&values);
            if inferred.is_numeric() || inferred == ColumnType::Null {
                continue;
            }
            tracing::debug!(column = name, ?inferred, "Numerical column holds non-numeric values");
            for (row, value) in values.iter().enumerate() {
                if !matches!(value, Value::Null | Value::Number(_)) {
                    problems.push(format!("column '{name}' row {row}: {value}"));
                }
            }
        }
        problems
    }

    /// Per-column KS test of `base` against `current`, written as YAML.
    pub fn detect_dataset_drift(
        &self,
        base: &DataBatch,
        current: &DataBatch,
    ) -> Result<DriftReport> {
        let ks = KolmogorovSmirnovTest::new(self.config.drift_threshold);
        let columns = self.schema.numeric_column_names();
        let report = detect_dataset_drift(base, current, &columns, &ks);
        atomic_write_yaml(&self.config.drift_report_file_path, &report)?;
        Ok(report)
    }

    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        let train = Self::read_data(self.ingestion_artifact.trained_file_path())?;
        let test = Self::read_data(self.ingestion_artifact.test_file_path())?;

        self.validate_number_of_columns(&train, "train")?;
        self.validate_number_of_columns(&test, "test")?;

        let mut problems = self.non_numeric_cells(&train);
        problems.extend(self.non_numeric_cells(&test));
        let is_valid = problems.is_empty();
        if !is_valid {
            tracing::warn!(
                count = problems.len(),
                first = %problems[0],
                "Non-numeric values in numerical columns"
            );
        }

        let report = self.detect_dataset_drift(&train, &test)?;
        if report.drift_detected {
            tracing::warn!(
                columns = ?report.drifted_columns(),
                threshold = report.drift_threshold,
                "Dataset drift detected"
            );
        } else {
            tracing::info!("No dataset drift detected");
        }

        let cfg = &self.config;
        let artifact = if is_valid {
            write_csv(&train, &cfg.valid_train_file_path)?;
            write_csv(&test, &cfg.valid_test_file_path)?;
            DataValidationArtifact::valid(
                cfg.valid_train_file_path.clone(),
                cfg.valid_test_file_path.clone(),
                cfg.drift_report_file_path.clone(),
                report.drift_detected,
            )
        } else {
            write_csv(&train, &cfg.invalid_train_file_path)?;
            write_csv(&test, &cfg.invalid_test_file_path)?;
            DataValidationArtifact::invalid(
                cfg.invalid_train_file_path.clone(),
                cfg.invalid_test_file_path.clone(),
                cfg.drift_report_file_path.clone(),
                report.drift_detected,
            )
        };
        Ok(artifact)
    }
}
