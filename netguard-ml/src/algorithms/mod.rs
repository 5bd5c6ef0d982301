//! Candidate classifiers and their scoring.
//!
//! [`ModelSpec`] is the configured, unfitted form of a candidate. Fitting it
//! yields a [`TrainedModel`], which is what gets serialised into the model bundle.

pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod tree;

pub use forest::RandomForestClassifier;
pub use logistic::LogisticRegression;
pub use metrics::{ClassificationMetric, ScoreMetric};
pub use tree::DecisionTreeClassifier;

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// A candidate classifier and its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression {
        learning_rate: f64,
        max_iter: usize,
        alpha: f64,
    },
    DecisionTree {
        max_depth: Option<usize>,
        #[serde(default = "default_min_samples_split")]
        min_samples_split: usize,
    },
    RandomForest {
        n_estimators: usize,
        max_depth: Option<usize>,
        #[serde(default = "default_min_samples_split")]
        min_samples_split: usize,
    },
}

fn default_min_samples_split() -> usize {
    2
}

impl ModelSpec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::DecisionTree { .. } => "decision_tree",
            Self::RandomForest { .. } => "random_forest",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::LogisticRegression {
                learning_rate,
                max_iter,
                alpha,
            } => {
                if !(learning_rate > 0.0 && learning_rate.is_finite()) {
                    return Err(PipelineError::config(format!(
                        "logistic_regression learning_rate must be positive, got {learning_rate}"
                    )));
                }
                if max_iter == 0 {
                    return Err(PipelineError::config(
                        "logistic_regression max_iter must be at least 1",
                    ));
                }
                if alpha.is_nan() || alpha < 0.0 {
                    return Err(PipelineError::config(format!(
                        "logistic_regression alpha must be non-negative, got {alpha}"
                    )));
                }
            }
            Self::DecisionTree {
                max_depth,
                min_samples_split,
            } => check_tree_params(self.name(), max_depth, min_samples_split)?,
            Self::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
            } => {
                if n_estimators == 0 {
                    return Err(PipelineError::config(
                        "random_forest n_estimators must be at least 1",
                    ));
                }
                check_tree_params(self.name(), max_depth, min_samples_split)?;
            }
        }
        Ok(())
    }

    /// Fit the candidate on `x`/`y`. Labels must be 0 or 1.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, rng: &mut StdRng) -> Result<TrainedModel> {
        check_binary_labels(y)?;
        let model = match *self {
            Self::LogisticRegression {
                learning_rate,
                max_iter,
                alpha,
            } => {
                let mut model = LogisticRegression::new(learning_rate, max_iter, alpha);
                model.fit(x, y)?;
                TrainedModel::LogisticRegression(model)
            }
            Self::DecisionTree {
                max_depth,
                min_samples_split,
            } => {
                let mut model = DecisionTreeClassifier::new(max_depth, min_samples_split);
                model.fit(x, y, rng)?;
                TrainedModel::DecisionTree(model)
            }
            Self::RandomForest {
                n_estimators,
                max_depth,
                min_samples_split,
            } => {
                let mut model =
                    RandomForestClassifier::new(n_estimators, max_depth, min_samples_split);
                model.fit(x, y, rng)?;
                TrainedModel::RandomForest(model)
            }
        };
        Ok(model)
    }
}

fn check_tree_params(name: &str, max_depth: Option<usize>, min_samples_split: usize) -> Result<()> {
    if max_depth == Some(0) {
        return Err(PipelineError::config(format!("{name} max_depth must be at least 1")));
    }
    if min_samples_split < 2 {
        return Err(PipelineError::config(format!(
            "{name} min_samples_split must be at least 2, got {min_samples_split}"
        )));
    }
    Ok(())
}

fn check_binary_labels(y: &Array1<f64>) -> Result<()> {
    if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(PipelineError::training(format!(
            "labels must be 0 or 1, found {bad}"
        )));
    }
    Ok(())
}

/// A fitted classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "model", rename_all = "snake_case")]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
}

impl TrainedModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::DecisionTree(_) => "decision_tree",
            Self::RandomForest(_) => "random_forest",
        }
    }

    /// Predicted labels (0 or 1), one per row.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::LogisticRegression(m) => m.predict(x),
            Self::DecisionTree(m) => m.predict(x),
            Self::RandomForest(m) => m.predict(x),
        }
    }
}
