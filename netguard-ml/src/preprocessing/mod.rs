//! Feature preprocessing fitted on the training split.

pub mod imputer;

pub use imputer::{FittedKnnImputer, KnnImputer};

use crate::error::{PipelineError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// The fitted feature transform persisted next to the model.
///
/// Holds the feature column order it was fit with so inference can check that
/// its input lines up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    feature_columns: Vec<String>,
    imputer: FittedKnnImputer,
}

impl Preprocessor {
    /// Fit on the training features and return them transformed.
    pub fn fit_transform(
        feature_columns: Vec<String>,
        imputer: KnnImputer,
        train: &Array2<f64>,
    ) -> Result<(Self, Array2<f64>)> {
        if feature_columns.len() != train.ncols() {
            return Err(PipelineError::invalid_data(format!(
                "{} feature names for a matrix with {} columns",
                feature_columns.len(),
                train.ncols()
            )));
        }
        let (imputer, transformed) = imputer.fit_transform(train)?;
        Ok((
            Self {
                feature_columns,
                imputer,
            },
            transformed,
        ))
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.imputer.transform(x)
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn imputer(&self) -> &FittedKnnImputer {
        &self.imputer
    }
}
