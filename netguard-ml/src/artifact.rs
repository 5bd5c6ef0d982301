//! Stage outputs.
//!
//! Each stage returns one artifact naming the files it wrote. Artifacts are built
//! once and only read afterwards, so fields are private behind accessors.

use crate::algorithms::ClassificationMetric;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

fn opt_display(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map_or_else(|| "None".to_string(), |p| p.display().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    trained_file_path: PathBuf,
    test_file_path: PathBuf,
}

impl DataIngestionArtifact {
    pub fn new(trained_file_path: PathBuf, test_file_path: PathBuf) -> Self {
        Self {
            trained_file_path,
            test_file_path,
        }
    }

    pub fn trained_file_path(&self) -> &Path {
        &self.trained_file_path
    }

    pub fn test_file_path(&self) -> &Path {
        &self.test_file_path
    }
}

impl fmt::Display for DataIngestionArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataIngestionArtifact(trained_file_path={}, test_file_path={})",
            self.trained_file_path.display(),
            self.test_file_path.display()
        )
    }
}

/// Outcome of validation. Exactly one of the valid/invalid path pairs is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    validation_status: bool,
    valid_train_file_path: Option<PathBuf>,
    valid_test_file_path: Option<PathBuf>,
    invalid_train_file_path: Option<PathBuf>,
    invalid_test_file_path: Option<PathBuf>,
    drift_report_file_path: PathBuf,
    drift_detected: bool,
}

impl DataValidationArtifact {
    pub fn valid(
        train: PathBuf,
        test: PathBuf,
        drift_report_file_path: PathBuf,
        drift_detected: bool,
    ) -> Self {
        Self {
            validation_status: true,
            valid_train_file_path: Some(train),
            valid_test_file_path: Some(test),
            invalid_train_file_path: None,
            invalid_test_file_path: None,
            drift_report_file_path,
            drift_detected,
        }
    }

    pub fn invalid(
        train: PathBuf,
        test: PathBuf,
        drift_report_file_path: PathBuf,
        drift_detected: bool,
    ) -> Self {
        Self {
            validation_status: false,
            valid_train_file_path: None,
            valid_test_file_path: None,
            invalid_train_file_path: Some(train),
            invalid_test_file_path: Some(test),
            drift_report_file_path,
            drift_detected,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validation_status
    }

    pub fn valid_train_file_path(&self) -> Option<&Path> {
        self.valid_train_file_path.as_deref()
    }

    pub fn valid_test_file_path(&self) -> Option<&Path> {
        self.valid_test_file_path.as_deref()
    }

    pub fn invalid_train_file_path(&self) -> Option<&Path> {
        self.invalid_train_file_path.as_deref()
    }

    pub fn invalid_test_file_path(&self) -> Option<&Path> {
        self.invalid_test_file_path.as_deref()
    }

    pub fn drift_report_file_path(&self) -> &Path {
        &self.drift_report_file_path
    }

    pub fn drift_detected(&self) -> bool {
        self.drift_detected
    }
}

impl fmt::Display for DataValidationArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataValidationArtifact(validation_status={}, valid_train_file_path={}, \
             valid_test_file_path={}, invalid_train_file_path={}, invalid_test_file_path={}, \
             drift_report_file_path={}, drift_detected={})",
            self.validation_status,
            opt_display(&self.valid_train_file_path),
            opt_display(&self.valid_test_file_path),
            opt_display(&self.invalid_train_file_path),
            opt_display(&self.invalid_test_file_path),
            self.drift_report_file_path.display(),
            self.drift_detected
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    transformed_object_file_path: PathBuf,
    transformed_train_file_path: PathBuf,
    transformed_test_file_path: PathBuf,
}

impl DataTransformationArtifact {
    pub fn new(
        transformed_object_file_path: PathBuf,
        transformed_train_file_path: PathBuf,
        transformed_test_file_path: PathBuf,
    ) -> Self {
        Self {
            transformed_object_file_path,
            transformed_train_file_path,
            transformed_test_file_path,
        }
    }

    /// The fitted preprocessor.
    pub fn transformed_object_file_path(&self) -> &Path {
        &self.transformed_object_file_path
    }

    pub fn transformed_train_file_path(&self) -> &Path {
        &self.transformed_train_file_path
    }

    pub fn transformed_test_file_path(&self) -> &Path {
        &self.transformed_test_file_path
    }
}

impl fmt::Display for DataTransformationArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataTransformationArtifact(transformed_object_file_path={}, \
             transformed_train_file_path={}, transformed_test_file_path={})",
            self.transformed_object_file_path.display(),
            self.transformed_train_file_path.display(),
            self.transformed_test_file_path.display()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    trained_model_file_path: PathBuf,
    saved_model_file_path: PathBuf,
    model_name: String,
    train_metric: ClassificationMetric,
    test_metric: ClassificationMetric,
}

impl ModelTrainerArtifact {
    pub fn new(
        trained_model_file_path: PathBuf,
        saved_model_file_path: PathBuf,
        model_name: impl Into<String>,
        train_metric: ClassificationMetric,
        test_metric: ClassificationMetric,
    ) -> Self {
        Self {
            trained_model_file_path,
            saved_model_file_path,
            model_name: model_name.into(),
            train_metric,
            test_metric,
        }
    }

    pub fn trained_model_file_path(&self) -> &Path {
        &self.trained_model_file_path
    }

    pub fn saved_model_file_path(&self) -> &Path {
        &self.saved_model_file_path
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn train_metric(&self) -> &ClassificationMetric {
        &self.train_metric
    }

    pub fn test_metric(&self) -> &ClassificationMetric {
        &self.test_metric
    }
}

impl fmt::Display for ModelTrainerArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = |c: &ClassificationMetric| {
            format!(
                "ClassificationMetric(f1_score={:.4}, precision_score={:.4}, recall_score={:.4}, accuracy={:.4})",
                c.f1_score, c.precision_score, c.recall_score, c.accuracy
            )
        };
        write!(
            f,
            "ModelTrainerArtifact(trained_model_file_path={}, saved_model_file_path={}, \
             model_name={}, train_metric={}, test_metric={})",
            self.trained_model_file_path.display(),
            self.saved_model_file_path.display(),
            self.model_name,
            m(&self.train_metric),
            m(&self.test_metric)
        )
    }
}

/// Lineage record of one completed run, written as `pipeline_run.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pipeline_name: String,
    timestamp: String,
    data_ingestion: DataIngestionArtifact,
    data_validation: DataValidationArtifact,
    data_transformation: DataTransformationArtifact,
    model_trainer: ModelTrainerArtifact,
    /// SHA-256 of the persisted model bundle.
    model_sha256: String,
    completed_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn new(
        pipeline_name: impl Into<String>,
        timestamp: impl Into<String>,
        data_ingestion: DataIngestionArtifact,
        data_validation: DataValidationArtifact,
        data_transformation: DataTransformationArtifact,
        model_trainer: ModelTrainerArtifact,
        model_sha256: String,
    ) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            timestamp: timestamp.into(),
            data_ingestion,
            data_validation,
            data_transformation,
            model_trainer,
            model_sha256,
            completed_at: Utc::now(),
        }
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data_ingestion(&self) -> &DataIngestionArtifact {
        &self.data_ingestion
    }

    pub fn data_validation(&self) -> &DataValidationArtifact {
        &self.data_validation
    }

    pub fn data_transformation(&self) -> &DataTransformationArtifact {
        &self.data_transformation
    }

    pub fn model_trainer(&self) -> &ModelTrainerArtifact {
        &self.model_trainer
    }

    pub fn model_sha256(&self) -> &str {
        &self.model_sha256
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_artifact_sets_one_pair() {
        let ok = DataValidationArtifact::valid("a".into(), "b".into(), "r".into(), true);
        assert!(ok.is_valid());
        assert_eq!(ok.valid_train_file_path(), Some(Path::new("a")));
        assert!(ok.invalid_train_file_path().is_none());
        assert!(ok.drift_detected());

        let bad = DataValidationArtifact::invalid("a".into(), "b".into(), "r".into(), false);
        assert!(!bad.is_valid());
        assert!(bad.valid_test_file_path().is_none());
        assert_eq!(bad.invalid_test_file_path(), Some(Path::new("b")));
    }

    #[test]
    fn test_display_names_fields() {
        let art = DataIngestionArtifact::new("x/train.csv".into(), "x/test.csv".into());
        assert_eq!(
            art.to_string(),
            "DataIngestionArtifact(trained_file_path=x/train.csv, test_file_path=x/test.csv)"
        );

        let bad = DataValidationArtifact::invalid("a".into(), "b".into(), "r".into(), false);
        assert!(bad.to_string().contains("valid_train_file_path=None"));
    }
}
