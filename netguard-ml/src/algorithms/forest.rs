//! Bagged ensemble of decision trees with per-split feature subsampling.

use super::tree::DecisionTreeClassifier;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    trees: Vec<DecisionTreeClassifier>,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, min_samples_split: usize) -> Self {
        Self {
            n_estimators,
            max_depth,
            min_samples_split,
            trees: Vec::new(),
        }
    }

    /// Fit each tree on a bootstrap sample, considering `sqrt(n_features)` features per split.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, rng: &mut StdRng) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::training("random forest needs at least one tree"));
        }
        if x.nrows() != y.len() {
            return Err(PipelineError::training(format!(
                "{} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(PipelineError::training("cannot fit a forest on zero rows"));
        }
        let max_features = ((x.ncols() as f64).sqrt().round() as usize).max(1);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let xb = x.select(Axis(0), &sample);
            let yb = y.select(Axis(0), &sample);

            let mut tree = DecisionTreeClassifier::new(self.max_depth, self.min_samples_split)
                .with_max_features(max_features);
            tree.fit(&xb, &yb, rng)?;
            trees.push(tree);
        }
        self.trees = trees;
        Ok(())
    }

    /// Majority vote; an even split goes to the positive class.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::training("random forest is not fitted"));
        }
        let mut votes = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            votes += &tree.predict(x)?;
        }
        let n = self.trees.len() as f64;
        Ok(votes.mapv(|v| if v / n >= 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
