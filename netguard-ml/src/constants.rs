//! Directory and file names of the artifact tree.
//!
//! Tunables (ratios, thresholds, paths to inputs) live in
//! [`PipelineSettings`](crate::config::PipelineSettings); these names are fixed so
//! every run produces the same layout.

pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

pub const FILE_NAME: &str = "data.csv";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const RUN_RECORD_FILE_NAME: &str = "pipeline_run.json";

pub const DATA_INGESTION_DIR_NAME: &str = "data_ingestion";
pub const DATA_INGESTION_FEATURE_STORE_DIR: &str = "feature_store";
pub const DATA_INGESTION_INGESTED_DIR: &str = "ingested";

pub const DATA_VALIDATION_DIR_NAME: &str = "data_validation";
pub const DATA_VALIDATION_VALID_DIR: &str = "validated";
pub const DATA_VALIDATION_INVALID_DIR: &str = "invalid";
pub const DATA_VALIDATION_DRIFT_REPORT_DIR: &str = "drift_report";
pub const DATA_VALIDATION_DRIFT_REPORT_FILE_NAME: &str = "report.yaml";

pub const DATA_TRANSFORMATION_DIR_NAME: &str = "data_transformation";
pub const DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR: &str = "transformed";
pub const DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR: &str = "transformed_object";
pub const TRANSFORMED_TRAIN_FILE_NAME: &str = "train.json";
pub const TRANSFORMED_TEST_FILE_NAME: &str = "test.json";
pub const PREPROCESSING_OBJECT_FILE_NAME: &str = "preprocessing.json";

pub const MODEL_TRAINER_DIR_NAME: &str = "model_trainer";
pub const MODEL_TRAINER_TRAINED_MODEL_DIR: &str = "trained_model";
pub const MODEL_FILE_NAME: &str = "model.json";

/// Cell values read as missing. The usual NA spellings of CSV exports, plus "na".
pub const MISSING_VALUE_PLACEHOLDERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "na",
];
