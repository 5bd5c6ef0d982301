//! Configuration for a pipeline run.
//!
//! [`PipelineSettings`] holds the tunables and is loaded with `figment`:
//! defaults -> `netguard.toml` -> `NETGUARD_*` environment variables.
//! [`PipelineConfig`] is built from the settings once per run and fixes the
//! timestamped artifact directory. Each stage config derives its paths from it.

use crate::algorithms::{ModelSpec, ScoreMetric};
use crate::constants::*;
use crate::error::{PipelineError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional settings file looked up in the working directory.
pub const SETTINGS_FILE_NAME: &str = "netguard.toml";

/// Prefix of environment overrides (`NETGUARD_EXPECTED_SCORE=0.7`).
pub const ENV_PREFIX: &str = "NETGUARD_";

/// Tunables shared by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,
    /// Root under which each run gets a timestamped directory.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
    /// Directory holding the mirror of the latest accepted model.
    #[serde(default = "default_saved_model_dir")]
    pub saved_model_dir: PathBuf,
    #[serde(default = "default_source_csv_path")]
    pub source_csv_path: PathBuf,
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    /// Fraction of rows routed to the test split, exclusive range (0, 1).
    #[serde(default = "default_split_ratio")]
    pub train_test_split_ratio: f64,
    /// Seed for the split shuffle and forest bootstraps. Unset means a fresh seed each run.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// KS p-value below which a column counts as drifted.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
    #[serde(default = "default_imputer_neighbors")]
    pub imputer_neighbors: usize,
    /// Target value rewritten to 0 before training.
    #[serde(default = "default_target_sentinel")]
    pub target_sentinel: f64,
    /// Minimum test score for a model to be accepted.
    #[serde(default = "default_expected_score")]
    pub expected_score: f64,
    /// Maximum allowed gap between train and test score.
    #[serde(default = "default_overfitting_threshold")]
    pub overfitting_threshold: f64,
    #[serde(default)]
    pub score_metric: ScoreMetric,
    #[serde(default = "default_candidates")]
    pub candidates: Vec<ModelSpec>,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pipeline_name: default_pipeline_name(),
            artifact_root: default_artifact_root(),
            saved_model_dir: default_saved_model_dir(),
            source_csv_path: default_source_csv_path(),
            schema_path: default_schema_path(),
            target_column: default_target_column(),
            train_test_split_ratio: default_split_ratio(),
            random_seed: None,
            drift_threshold: default_drift_threshold(),
            imputer_neighbors: default_imputer_neighbors(),
            target_sentinel: default_target_sentinel(),
            expected_score: default_expected_score(),
            overfitting_threshold: default_overfitting_threshold(),
            score_metric: ScoreMetric::default(),
            candidates: default_candidates(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_pipeline_name() -> String {
    "NetworkSecurity".to_string()
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("Artifacts")
}

fn default_saved_model_dir() -> PathBuf {
    PathBuf::from("saved_models")
}

fn default_source_csv_path() -> PathBuf {
    PathBuf::from("NetworkData").join("data.csv")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("data_schema").join("schema.yaml")
}

fn default_target_column() -> String {
    "Result".to_string()
}

fn default_split_ratio() -> f64 {
    0.2
}

fn default_drift_threshold() -> f64 {
    0.05
}

fn default_imputer_neighbors() -> usize {
    3
}

fn default_target_sentinel() -> f64 {
    -1.0
}

fn default_expected_score() -> f64 {
    0.6
}

fn default_overfitting_threshold() -> f64 {
    0.05
}

fn default_candidates() -> Vec<ModelSpec> {
    vec![
        ModelSpec::RandomForest {
            n_estimators: 32,
            max_depth: Some(12),
            min_samples_split: 2,
        },
        ModelSpec::DecisionTree {
            max_depth: Some(8),
            min_samples_split: 2,
        },
        ModelSpec::LogisticRegression {
            learning_rate: 0.1,
            max_iter: 1000,
            alpha: 0.01,
        },
    ]
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl PipelineSettings {
    /// Reject settings no stage could run with.
    pub fn validate(&self) -> Result<()> {
        let ratio = self.train_test_split_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PipelineError::config(format!(
                "train_test_split_ratio must be in (0, 1), got {ratio}"
            )));
        }
        if !(self.drift_threshold > 0.0 && self.drift_threshold < 1.0) {
            return Err(PipelineError::config(format!(
                "drift_threshold must be in (0, 1), got {}",
                self.drift_threshold
            )));
        }
        if self.imputer_neighbors == 0 {
            return Err(PipelineError::config("imputer_neighbors must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.expected_score) {
            return Err(PipelineError::config(format!(
                "expected_score must be in [0, 1], got {}",
                self.expected_score
            )));
        }
        if self.overfitting_threshold.is_nan() || self.overfitting_threshold < 0.0 {
            return Err(PipelineError::config(format!(
                "overfitting_threshold must be non-negative, got {}",
                self.overfitting_threshold
            )));
        }
        if self.target_column.trim().is_empty() {
            return Err(PipelineError::config("target_column must not be empty"));
        }
        if self.candidates.is_empty() {
            return Err(PipelineError::config("at least one model candidate is required"));
        }
        for spec in &self.candidates {
            spec.validate()?;
        }
        Ok(())
    }
}

/// Load settings from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `NETGUARD_`, nested keys split on `__`)
/// 2. `netguard.toml` in `workspace`
/// 3. Built-in defaults
pub fn load_settings(workspace: Option<&Path>) -> Result<PipelineSettings> {
    let mut figment = Figment::from(Serialized::defaults(PipelineSettings::default()));

    if let Some(ws) = workspace {
        let file = ws.join(SETTINGS_FILE_NAME);
        if file.exists() {
            figment = figment.merge(Toml::file(&file));
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let settings: PipelineSettings = figment
        .extract()
        .map_err(|e| PipelineError::config(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

/// Process-wide configuration for one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pipeline_name: String,
    artifact_dir: PathBuf,
    timestamp: String,
    saved_model_dir: PathBuf,
    settings: PipelineSettings,
}

impl PipelineConfig {
    /// Build the run config stamped with the current local time.
    pub fn new(settings: PipelineSettings) -> Result<Self> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(settings, &timestamp)
    }

    pub fn with_timestamp(settings: PipelineSettings, timestamp: &str) -> Result<Self> {
        settings.validate()?;
        if timestamp.is_empty() {
            return Err(PipelineError::config("run timestamp must not be empty"));
        }
        Ok(Self {
            pipeline_name: settings.pipeline_name.clone(),
            artifact_dir: settings.artifact_root.join(timestamp),
            timestamp: timestamp.to_string(),
            saved_model_dir: settings.saved_model_dir.clone(),
            settings,
        })
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// `<artifact_root>/<timestamp>`.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn saved_model_dir(&self) -> &Path {
        &self.saved_model_dir
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn run_record_file_path(&self) -> PathBuf {
        self.artifact_dir.join(RUN_RECORD_FILE_NAME)
    }
}

#[derive(Debug, Clone)]
pub struct DataIngestionConfig {
    pub data_ingestion_dir: PathBuf,
    pub source_csv_path: PathBuf,
    pub feature_store_file_path: PathBuf,
    pub training_file_path: PathBuf,
    pub testing_file_path: PathBuf,
    pub train_test_split_ratio: f64,
    pub random_seed: Option<u64>,
}

impl DataIngestionConfig {
    pub fn new(pipeline: &PipelineConfig) -> Self {
        let dir = pipeline.artifact_dir().join(DATA_INGESTION_DIR_NAME);
        let ingested = dir.join(DATA_INGESTION_INGESTED_DIR);
        Self {
            feature_store_file_path: dir.join(DATA_INGESTION_FEATURE_STORE_DIR).join(FILE_NAME),
            training_file_path: ingested.join(TRAIN_FILE_NAME),
            testing_file_path: ingested.join(TEST_FILE_NAME),
            source_csv_path: pipeline.settings().source_csv_path.clone(),
            train_test_split_ratio: pipeline.settings().train_test_split_ratio,
            random_seed: pipeline.settings().random_seed,
            data_ingestion_dir: dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataValidationConfig {
    pub data_validation_dir: PathBuf,
    pub schema_path: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: PathBuf,
    pub invalid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub drift_threshold: f64,
}

impl DataValidationConfig {
    pub fn new(pipeline: &PipelineConfig) -> Self {
        let dir = pipeline.artifact_dir().join(DATA_VALIDATION_DIR_NAME);
        let valid = dir.join(DATA_VALIDATION_VALID_DIR);
        let invalid = dir.join(DATA_VALIDATION_INVALID_DIR);
        Self {
            schema_path: pipeline.settings().schema_path.clone(),
            valid_train_file_path: valid.join(TRAIN_FILE_NAME),
            valid_test_file_path: valid.join(TEST_FILE_NAME),
            invalid_train_file_path: invalid.join(TRAIN_FILE_NAME),
            invalid_test_file_path: invalid.join(TEST_FILE_NAME),
            drift_report_file_path: dir
                .join(DATA_VALIDATION_DRIFT_REPORT_DIR)
                .join(DATA_VALIDATION_DRIFT_REPORT_FILE_NAME),
            drift_threshold: pipeline.settings().drift_threshold,
            data_validation_dir: dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataTransformationConfig {
    pub data_transformation_dir: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    pub target_column: String,
    pub target_sentinel: f64,
    pub imputer_neighbors: usize,
}

impl DataTransformationConfig {
    pub fn new(pipeline: &PipelineConfig) -> Self {
        let dir = pipeline.artifact_dir().join(DATA_TRANSFORMATION_DIR_NAME);
        let transformed = dir.join(DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR);
        Self {
            transformed_train_file_path: transformed.join(TRANSFORMED_TRAIN_FILE_NAME),
            transformed_test_file_path: transformed.join(TRANSFORMED_TEST_FILE_NAME),
            transformed_object_file_path: dir
                .join(DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR)
                .join(PREPROCESSING_OBJECT_FILE_NAME),
            target_column: pipeline.settings().target_column.clone(),
            target_sentinel: pipeline.settings().target_sentinel,
            imputer_neighbors: pipeline.settings().imputer_neighbors,
            data_transformation_dir: dir,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelTrainerConfig {
    pub model_trainer_dir: PathBuf,
    pub trained_model_file_path: PathBuf,
    /// Mirror of the accepted model outside the run directory.
    pub saved_model_file_path: PathBuf,
    pub expected_score: f64,
    pub overfitting_threshold: f64,
    pub score_metric: ScoreMetric,
    pub candidates: Vec<ModelSpec>,
    pub random_seed: Option<u64>,
}

impl ModelTrainerConfig {
    pub fn new(pipeline: &PipelineConfig) -> Self {
        let settings = pipeline.settings();
        let dir = pipeline.artifact_dir().join(MODEL_TRAINER_DIR_NAME);
        Self {
            trained_model_file_path: dir
                .join(MODEL_TRAINER_TRAINED_MODEL_DIR)
                .join(MODEL_FILE_NAME),
            saved_model_file_path: pipeline.saved_model_dir().join(MODEL_FILE_NAME),
            expected_score: settings.expected_score,
            overfitting_threshold: settings.overfitting_threshold,
            score_metric: settings.score_metric,
            candidates: settings.candidates.clone(),
            random_seed: settings.random_seed,
            model_trainer_dir: dir,
        }
    }
}
