//! L2-regularised logistic regression trained with full-batch gradient descent.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub max_iter: usize,
    /// L2 penalty on the weights (not the intercept).
    pub alpha: f64,
    weights: Option<Array1<f64>>,
    intercept: f64,
    /// Feature standardisation learned at fit time.
    feature_mean: Array1<f64>,
    feature_scale: Array1<f64>,
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, max_iter: usize, alpha: f64) -> Self {
        Self {
            learning_rate,
            max_iter,
            alpha,
            weights: None,
            intercept: 0.0,
            feature_mean: Array1::zeros(0),
            feature_scale: Array1::zeros(0),
        }
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PipelineError::training(format!(
                "{} rows but {} labels",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(PipelineError::training("cannot fit logistic regression on zero rows"));
        }

        self.feature_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::training("empty feature matrix"))?;
        // Constant columns keep a unit scale so they standardise to zero.
        self.feature_scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        let xs = self.standardize(x);

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        for _ in 0..self.max_iter {
            let predictions = Self::sigmoid(&(xs.dot(&weights) + bias));
            let errors = &predictions - y;
            let dw = xs.t().dot(&errors) / n_samples as f64 + self.alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < TOLERANCE {
                break;
            }
            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(PipelineError::training(
                "logistic regression diverged, lower the learning rate",
            ));
        }
        self.weights = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| PipelineError::training("logistic regression is not fitted"))?;
        if x.ncols() != weights.len() {
            return Err(PipelineError::invalid_data(format!(
                "model was fit on {} features, got {}",
                weights.len(),
                x.ncols()
            )));
        }
        Ok(Self::sigmoid(&(self.standardize(x).dot(weights) + self.intercept)))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    fn standardize(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.feature_mean) / &self.feature_scale
    }
}
