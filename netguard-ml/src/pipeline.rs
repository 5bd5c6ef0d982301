//! Training pipeline orchestration.
//!
//! Stages run strictly in order, each fed the previous stage's artifact. The first
//! failure aborts the run; the error leaves here tagged with the stage it came from.

use crate::artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelTrainerArtifact, PipelineRun,
};
use crate::components::{DataIngestion, DataTransformation, DataValidation, ModelTrainer};
use crate::config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelTrainerConfig,
    PipelineConfig,
};
use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::persistence::{atomic_write_json, hash_file};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Pipeline stage, displayed as its artifact directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Ingestion,
    Validation,
    Transformation,
    ModelTrainer,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingestion => DATA_INGESTION_DIR_NAME,
            Self::Validation => DATA_VALIDATION_DIR_NAME,
            Self::Transformation => DATA_TRANSFORMATION_DIR_NAME,
            Self::ModelTrainer => MODEL_TRAINER_DIR_NAME,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run `stage`, logging start and finish and tagging any error with `name`.
fn run_stage<T>(name: StageName, stage: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::info!(stage = %name, "Stage started");
    let started = Instant::now();
    match stage() {
        Ok(out) => {
            tracing::info!(
                stage = %name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Stage completed"
            );
            Ok(out)
        }
        Err(e) => {
            let e = e.in_stage(name);
            tracing::error!(stage = %name, error = %e, "Stage failed");
            Err(e)
        }
    }
}

pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn start_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        run_stage(StageName::Ingestion, || {
            DataIngestion::new(DataIngestionConfig::new(&self.config))?.initiate_data_ingestion()
        })
    }

    /// Validation plus the validity check: invalid data stops the run here.
    pub fn start_data_validation(
        &self,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact> {
        run_stage(StageName::Validation, || {
            let artifact =
                DataValidation::new(ingestion.clone(), DataValidationConfig::new(&self.config))?
                    .initiate_data_validation()?;
            if !artifact.is_valid() {
                return Err(PipelineError::invalid_data(format!(
                    "data failed validation, see {}",
                    artifact
                        .invalid_train_file_path()
                        .map_or_else(String::new, |p| p.display().to_string())
                )));
            }
            Ok(artifact)
        })
    }

    pub fn start_data_transformation(
        &self,
        validation: &DataValidationArtifact,
    ) -> Result<DataTransformationArtifact> {
        run_stage(StageName::Transformation, || {
            DataTransformation::new(
                validation.clone(),
                DataTransformationConfig::new(&self.config),
            )?
            .initiate_data_transformation()
        })
    }

    pub fn start_model_trainer(
        &self,
        transformation: &DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact> {
        run_stage(StageName::ModelTrainer, || {
            ModelTrainer::new(transformation.clone(), ModelTrainerConfig::new(&self.config))
                .initiate_model_trainer()
        })
    }

    /// Run all four stages and write the run record.
    pub fn run(&self) -> Result<PipelineRun> {
        self.run_with(|_, _| {})
    }

    /// Like [`run`](Self::run), handing each stage's artifact to `on_artifact` as
    /// soon as the stage finishes.
    pub fn run_with<F>(&self, mut on_artifact: F) -> Result<PipelineRun>
    where
        F: FnMut(StageName, &dyn fmt::Display),
    {
        tracing::info!(
            pipeline = self.config.pipeline_name(),
            artifact_dir = %self.config.artifact_dir().display(),
            "Pipeline started"
        );

        let ingestion = self.start_data_ingestion()?;
        tracing::info!(artifact = %ingestion);
        on_artifact(StageName::Ingestion, &ingestion);
        let validation = self.start_data_validation(&ingestion)?;
        tracing::info!(artifact = %validation);
        on_artifact(StageName::Validation, &validation);
        let transformation = self.start_data_transformation(&validation)?;
        tracing::info!(artifact = %transformation);
        on_artifact(StageName::Transformation, &transformation);
        let trainer = self.start_model_trainer(&transformation)?;
        tracing::info!(artifact = %trainer);
        on_artifact(StageName::ModelTrainer, &trainer);

        let model_sha256 = hash_file(trainer.trained_model_file_path())?;
        let run = PipelineRun::new(
            self.config.pipeline_name(),
            self.config.timestamp(),
            ingestion,
            validation,
            transformation,
            trainer,
            model_sha256,
        );
        atomic_write_json(&self.config.run_record_file_path(), &run)?;

        tracing::info!(
            record = %self.config.run_record_file_path().display(),
            model_sha256 = run.model_sha256(),
            "Pipeline completed"
        );
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineSettings;
    use tempfile::TempDir;

    #[test]
    fn test_stage_names_match_artifact_dirs() {
        assert_eq!(StageName::Ingestion.to_string(), "data_ingestion");
        assert_eq!(StageName::Validation.to_string(), "data_validation");
        assert_eq!(StageName::Transformation.to_string(), "data_transformation");
        assert_eq!(StageName::ModelTrainer.to_string(), "model_trainer");
    }

    #[test]
    fn test_missing_source_fails_in_ingestion() {
        let dir = TempDir::new().unwrap();
        let settings = PipelineSettings {
            artifact_root: dir.path().join("Artifacts"),
            source_csv_path: dir.path().join("absent.csv"),
            ..PipelineSettings::default()
        };
        let pipeline =
            TrainingPipeline::new(PipelineConfig::with_timestamp(settings, "run").unwrap());
        let err = pipeline.run().unwrap_err();
        assert_eq!(err.stage(), Some(StageName::Ingestion));
        assert!(matches!(err.kind(), crate::ErrorKind::DataSource(_)));
        assert!(err.to_string().starts_with("[data_ingestion] error occurred in ["));
    }
}
