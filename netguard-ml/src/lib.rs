//! # netguard-ml: network security model training pipeline
//!
//! A batch pipeline that turns a labelled CSV of URL/network features into a
//! persisted phishing classifier:
//!
//! 1. **Ingestion**: load the source, keep a feature-store copy, split train/test
//! 2. **Validation**: schema check, content check, per-column drift report
//! 3. **Transformation**: KNN imputation fit on the training split only
//! 4. **Model training**: fit candidates, pick the best, apply quality gates
//!
//! [`TrainingPipeline`] drives the stages; every run writes under a timestamped
//! directory below the configured artifact root.

pub mod algorithms;
pub mod artifact;
pub mod components;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod estimator;
pub mod persistence;
pub mod pipeline;
pub mod preprocessing;

// Re-exports
pub use artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelTrainerArtifact, PipelineRun,
};
pub use config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelTrainerConfig,
    PipelineConfig, PipelineSettings, load_settings,
};
pub use error::{ErrorKind, PipelineError, Result};
pub use estimator::NetworkModel;
pub use pipeline::{StageName, TrainingPipeline};
