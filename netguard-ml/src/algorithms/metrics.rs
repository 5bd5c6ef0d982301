//! Classification metrics for binary labels (positive class = 1).

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric used to rank candidates and gate the accepted model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    #[default]
    F1,
    Precision,
    Recall,
    Accuracy,
}

impl fmt::Display for ScoreMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F1 => "f1",
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::Accuracy => "accuracy",
        };
        f.write_str(name)
    }
}

/// Scores of one model on one split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetric {
    pub f1_score: f64,
    pub precision_score: f64,
    pub recall_score: f64,
    pub accuracy: f64,
}

impl ClassificationMetric {
    /// Undefined ratios (no predicted or no actual positives) score 0.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::training(format!(
                "label count {} does not match prediction count {}",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(PipelineError::training("cannot score an empty split"));
        }

        let (mut tp, mut fp, mut fn_, mut tn) = (0usize, 0usize, 0usize, 0usize);
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => tn += 1,
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Ok(Self {
            f1_score: f1,
            precision_score: precision,
            recall_score: recall,
            accuracy: ratio(tp + tn, tp + tn + fp + fn_),
        })
    }

    pub fn score(&self, metric: ScoreMetric) -> f64 {
        match metric {
            ScoreMetric::F1 => self.f1_score,
            ScoreMetric::Precision => self.precision_score,
            ScoreMetric::Recall => self.recall_score,
            ScoreMetric::Accuracy => self.accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_metric_values() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 1.0, 0.0];
        let m = ClassificationMetric::compute(&y_true, &y_pred).unwrap();
        assert!((m.precision_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert_eq!(m.score(ScoreMetric::Accuracy), m.accuracy);
    }

    #[test]
    fn test_no_positive_predictions_scores_zero() {
        let m = ClassificationMetric::compute(&array![1.0, 0.0], &array![0.0, 0.0]).unwrap();
        assert_eq!(m.f1_score, 0.0);
        assert_eq!(m.precision_score, 0.0);
        assert_eq!(m.accuracy, 0.5);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(ClassificationMetric::compute(&array![1.0], &array![1.0, 0.0]).is_err());
    }

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(serde_json::to_string(&ScoreMetric::F1).unwrap(), "\"f1\"");
        let m: ScoreMetric = serde_json::from_str("\"accuracy\"").unwrap();
        assert_eq!(m, ScoreMetric::Accuracy);
    }
}
