//! Transformation: split off the target, impute features, persist arrays and preprocessor.

use crate::artifact::{DataTransformationArtifact, DataValidationArtifact};
use crate::config::DataTransformationConfig;
use crate::data::{CsvSource, DataBatch, DataSource};
use crate::error::{PipelineError, Result};
use crate::persistence::{atomic_write_json, load_json};
use crate::preprocessing::{KnnImputer, Preprocessor};
use ndarray::{Array1, Array2, Axis, s};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A transformed split on disk: feature columns followed by the target as the last column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedSplit {
    feature_columns: Vec<String>,
    target_column: String,
    data: Array2<f64>,
}

impl TransformedSplit {
    pub fn new(
        feature_columns: Vec<String>,
        target_column: impl Into<String>,
        features: &Array2<f64>,
        target: &Array1<f64>,
    ) -> Result<Self> {
        if features.ncols() != feature_columns.len() || features.nrows() != target.len() {
            return Err(PipelineError::invalid_data(format!(
                "features are {}x{} with {} names, target has {} rows",
                features.nrows(),
                features.ncols(),
                feature_columns.len(),
                target.len()
            )));
        }
        let column = target.view().insert_axis(Axis(1));
        let data = ndarray::concatenate(Axis(1), &[features.view(), column])
            .map_err(|e| PipelineError::invalid_data(e.to_string()))?;
        Ok(Self {
            feature_columns,
            target_column: target_column.into(),
            data,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let split: Self = load_json(path)?;
        if split.data.ncols() != split.feature_columns.len() + 1 {
            return Err(PipelineError::invalid_data(format!(
                "{} has {} columns, expected {} features plus the target",
                path.display(),
                split.data.ncols(),
                split.feature_columns.len()
            )));
        }
        Ok(split)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        atomic_write_json(path, self)
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn features(&self) -> Array2<f64> {
        self.data.slice(s![.., ..self.feature_columns.len()]).to_owned()
    }

    pub fn target(&self) -> Array1<f64> {
        self.data.column(self.feature_columns.len()).to_owned()
    }
}

pub struct DataTransformation {
    validation_artifact: DataValidationArtifact,
    config: DataTransformationConfig,
}

impl DataTransformation {
    /// Refuses an artifact whose data failed validation.
    pub fn new(
        validation_artifact: DataValidationArtifact,
        config: DataTransformationConfig,
    ) -> Result<Self> {
        if !validation_artifact.is_valid() {
            return Err(PipelineError::invalid_data(
                "validation marked the data invalid, refusing to transform it",
            ));
        }
        Ok(Self {
            validation_artifact,
            config,
        })
    }

    pub fn get_data_transformer_object(&self) -> KnnImputer {
        KnnImputer::new(self.config.imputer_neighbors)
    }

    fn read_validated(&self, path: Option<&Path>, split: &str) -> Result<DataBatch> {
        let path = path.ok_or_else(|| {
            PipelineError::invalid_data(format!("no validated {split} file in artifact"))
        })?;
        CsvSource::new(path).load()
    }

    /// Feature column names in file order, everything but the target.
    fn feature_columns(&self, batch: &DataBatch) -> Result<Vec<String>> {
        if batch.column_index(&self.config.target_column).is_none() {
            return Err(PipelineError::schema_validation(format!(
                "target column '{}' not found",
                self.config.target_column
            )));
        }
        Ok(batch
            .columns
            .iter()
            .filter(|c| **c != self.config.target_column)
            .cloned()
            .collect())
    }

    /// Target column with the sentinel mapped to 0. Every label must end up 0 or 1.
    fn target(&self, batch: &DataBatch) -> Result<Array1<f64>> {
        let matrix = batch.to_matrix(std::slice::from_ref(&self.config.target_column))?;
        let sentinel = self.config.target_sentinel;
        let target = matrix
            .column(0)
            .mapv(|v| if v == sentinel { 0.0 } else { v });
        if let Some((row, v)) = target
            .iter()
            .enumerate()
            .find(|(_, v)| **v != 0.0 && **v != 1.0)
        {
            return Err(PipelineError::invalid_data(format!(
                "target '{}' row {row} is {v}, expected {sentinel}, 0 or 1",
                self.config.target_column
            )));
        }
        Ok(target)
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        let train = self.read_validated(self.validation_artifact.valid_train_file_path(), "train")?;
        let test = self.read_validated(self.validation_artifact.valid_test_file_path(), "test")?;

        let feature_columns = self.feature_columns(&train)?;
        let train_x = train.to_matrix(&feature_columns)?;
        let test_x = test.to_matrix(&feature_columns)?;
        let train_y = self.target(&train)?;
        let test_y = self.target(&test)?;

        let missing = train_x.iter().filter(|v| v.is_nan()).count();
        tracing::info!(
            features = feature_columns.len(),
            train_rows = train_x.nrows(),
            missing_cells = missing,
            k = self.config.imputer_neighbors,
            "Fitting KNN imputer on training features"
        );
        let (preprocessor, train_x) = Preprocessor::fit_transform(
            feature_columns.clone(),
            self.get_data_transformer_object(),
            &train_x,
        )?;
        let test_x = preprocessor.transform(&test_x)?;

        let target_column = self.config.target_column.as_str();
        TransformedSplit::new(feature_columns.clone(), target_column, &train_x, &train_y)?
            .save(&self.config.transformed_train_file_path)?;
        TransformedSplit::new(feature_columns, target_column, &test_x, &test_y)?
            .save(&self.config.transformed_test_file_path)?;
        atomic_write_json(&self.config.transformed_object_file_path, &preprocessor)?;

        Ok(DataTransformationArtifact::new(
            self.config.transformed_object_file_path.clone(),
            self.config.transformed_train_file_path.clone(),
            self.config.transformed_test_file_path.clone(),
        ))
    }
}
