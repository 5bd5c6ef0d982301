//! Model training: fit every candidate, keep the best, gate it, persist the bundle.

use crate::algorithms::{ClassificationMetric, ModelSpec, TrainedModel};
use crate::artifact::{DataTransformationArtifact, ModelTrainerArtifact};
use crate::components::transformation::TransformedSplit;
use crate::config::ModelTrainerConfig;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::estimator::NetworkModel;
use crate::persistence::{atomic_write, load_json};
use crate::preprocessing::Preprocessor;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// One fitted candidate and its scores.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub spec: ModelSpec,
    pub model: TrainedModel,
    pub train_metric: ClassificationMetric,
    pub test_metric: ClassificationMetric,
}

pub struct ModelTrainer {
    transformation_artifact: DataTransformationArtifact,
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    pub fn new(
        transformation_artifact: DataTransformationArtifact,
        config: ModelTrainerConfig,
    ) -> Self {
        Self {
            transformation_artifact,
            config,
        }
    }

    /// Fit and score each configured candidate, in configuration order.
    pub fn evaluate_models(
        &self,
        train: &TransformedSplit,
        test: &TransformedSplit,
    ) -> Result<Vec<CandidateResult>> {
        if self.config.candidates.is_empty() {
            return Err(PipelineError::config("no model candidates configured"));
        }
        let (x_train, y_train) = (train.features(), train.target());
        let (x_test, y_test) = (test.features(), test.target());
        let mut rng = match self.config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let metric = self.config.score_metric;
        let mut results = Vec::with_capacity(self.config.candidates.len());
        for spec in &self.config.candidates {
            let model = spec.fit(&x_train, &y_train, &mut rng)?;
            let train_metric = ClassificationMetric::compute(&y_train, &model.predict(&x_train)?)?;
            let test_metric = ClassificationMetric::compute(&y_test, &model.predict(&x_test)?)?;
            tracing::info!(
                model = spec.name(),
                %metric,
                train_score = train_metric.score(metric),
                test_score = test_metric.score(metric),
                "Evaluated candidate"
            );
            results.push(CandidateResult {
                spec: spec.clone(),
                model,
                train_metric,
                test_metric,
            });
        }
        Ok(results)
    }

    /// Highest test score wins; ties keep the earlier candidate.
    pub fn select_best(&self, results: Vec<CandidateResult>) -> Result<CandidateResult> {
        let metric = self.config.score_metric;
        results
            .into_iter()
            .reduce(|best, next| {
                if next.test_metric.score(metric) > best.test_metric.score(metric) {
                    next
                } else {
                    best
                }
            })
            .ok_or_else(|| PipelineError::training("no candidate produced a model"))
    }

    /// Accuracy gate first, then the train/test divergence gate.
    pub fn check_quality_gates(
        &self,
        train_metric: &ClassificationMetric,
        test_metric: &ClassificationMetric,
    ) -> Result<()> {
        let metric = self.config.score_metric;
        let train_score = train_metric.score(metric);
        let test_score = test_metric.score(metric);

        if test_score < self.config.expected_score {
            return Err(PipelineError::new(ErrorKind::InsufficientAccuracy {
                metric: metric.to_string(),
                score: test_score,
                expected: self.config.expected_score,
            }));
        }
        let difference = (train_score - test_score).abs();
        if difference > self.config.overfitting_threshold {
            return Err(PipelineError::new(ErrorKind::OverfitUnderfit {
                metric: metric.to_string(),
                train_score,
                test_score,
                difference,
                threshold: self.config.overfitting_threshold,
            }));
        }
        Ok(())
    }

    pub fn initiate_model_trainer(&self) -> Result<ModelTrainerArtifact> {
        let artifact = &self.transformation_artifact;
        let train = TransformedSplit::load(artifact.transformed_train_file_path())?;
        let test = TransformedSplit::load(artifact.transformed_test_file_path())?;
        let preprocessor: Preprocessor = load_json(artifact.transformed_object_file_path())?;
        if preprocessor.feature_columns() != train.feature_columns() {
            return Err(PipelineError::invalid_data(
                "preprocessor and training arrays disagree on feature columns",
            ));
        }

        let results = self.evaluate_models(&train, &test)?;
        let best = self.select_best(results)?;
        tracing::info!(
            model = best.spec.name(),
            test_f1 = best.test_metric.f1_score,
            "Selected best model"
        );

        self.check_quality_gates(&best.train_metric, &best.test_metric)?;

        let bundle = NetworkModel::new(preprocessor, best.model);
        let json = serde_json::to_string_pretty(&bundle)?;
        atomic_write(&self.config.trained_model_file_path, json.as_bytes())?;
        atomic_write(&self.config.saved_model_file_path, json.as_bytes())?;
        tracing::info!(
            path = %self.config.trained_model_file_path.display(),
            mirror = %self.config.saved_model_file_path.display(),
            "Saved model"
        );

        Ok(ModelTrainerArtifact::new(
            self.config.trained_model_file_path.clone(),
            self.config.saved_model_file_path.clone(),
            best.spec.name(),
            best.train_metric,
            best.test_metric,
        ))
    }
}
