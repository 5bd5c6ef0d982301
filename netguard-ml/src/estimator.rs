//! The persisted model bundle: fitted preprocessor plus classifier.

use crate::algorithms::TrainedModel;
use crate::data::DataBatch;
use crate::error::{PipelineError, Result};
use crate::persistence::load_json;
use crate::preprocessing::Preprocessor;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inference always runs the preprocessor before the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    preprocessor: Preprocessor,
    model: TrainedModel,
}

impl NetworkModel {
    pub fn new(preprocessor: Preprocessor, model: TrainedModel) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Predict labels for raw feature rows in the preprocessor's column order.
    /// Missing values are `NaN`.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        let transformed = self.preprocessor.transform(features)?;
        self.model.predict(&transformed)
    }

    /// Predict for a loaded batch, picking the feature columns by name.
    pub fn predict_batch(&self, batch: &DataBatch) -> Result<Array1<f64>> {
        if batch.row_count() == 0 {
            return Err(PipelineError::invalid_data("no rows to predict"));
        }
        let features = batch.to_matrix(self.preprocessor.feature_columns())?;
        self.predict(&features)
    }
}
