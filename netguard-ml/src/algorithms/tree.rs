//! CART decision tree for binary classification (Gini impurity).

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features sampled per split; `None` scans all of them.
    pub max_features: Option<usize>,
    root: Option<TreeNode>,
    n_features: usize,
}

impl DecisionTreeClassifier {
    pub fn new(max_depth: Option<usize>, min_samples_split: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: min_samples_split.max(2),
            max_features: None,
            root: None,
            n_features: 0,
        }
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// `rng` is only drawn from when `max_features` restricts the features per split.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, rng: &mut StdRng) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(PipelineError::training(format!(
                "{} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(PipelineError::training("cannot fit a tree on zero rows"));
        }
        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build(x, y, &indices, 0, rng));
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| PipelineError::training("decision tree is not fitted"))?;
        if x.ncols() != self.n_features {
            return Err(PipelineError::invalid_data(format!(
                "tree was fit on {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(x.rows().into_iter().map(|row| predict_row(root, row)).collect())
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut StdRng,
    ) -> TreeNode {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| y[i] >= 0.5).count();
        let leaf = TreeNode::Leaf {
            value: if positives * 2 > n { 1.0 } else { 0.0 },
            n_samples: n,
        };

        let pure = positives == 0 || positives == n;
        if pure || n < self.min_samples_split || self.max_depth.is_some_and(|d| depth >= d) {
            return leaf;
        }

        let features = self.candidate_features(x.ncols(), rng);
        let Some((feature_idx, threshold)) = best_split(x, y, indices, positives, &features) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature_idx]] <= threshold);

        TreeNode::Split {
            feature_idx,
            threshold,
            left: Box::new(self.build(x, y, &left, depth + 1, rng)),
            right: Box::new(self.build(x, y, &right, depth + 1, rng)),
        }
    }

    fn candidate_features(&self, n_features: usize, rng: &mut StdRng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => {
                let mut picked = rand::seq::index::sample(rng, n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..n_features).collect(),
        }
    }
}

fn gini(pos: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = pos as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

/// Best (feature, threshold) by Gini gain, sweeping each feature in sorted order.
/// Ties keep the earliest feature and the lowest threshold.
fn best_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    indices: &[usize],
    positives: usize,
    features: &[usize],
) -> Option<(usize, f64)> {
    let n = indices.len();
    let parent = gini(positives, n);
    let mut best: Option<(usize, f64, f64)> = None;

    for &f in features {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| x[[a, f]].partial_cmp(&x[[b, f]]).unwrap_or(Ordering::Equal));

        let mut left_pos = 0usize;
        for k in 0..n - 1 {
            if y[sorted[k]] >= 0.5 {
                left_pos += 1;
            }
            let (lo, hi) = (x[[sorted[k], f]], x[[sorted[k + 1], f]]);
            if lo >= hi {
                continue;
            }
            let left_n = k + 1;
            let right_n = n - left_n;
            let weighted = (left_n as f64 * gini(left_pos, left_n)
                + right_n as f64 * gini(positives - left_pos, right_n))
                / n as f64;
            let gain = parent - weighted;
            if gain > 1e-12 && best.is_none_or(|(_, _, g)| gain > g + 1e-12) {
                best = Some((f, (lo + hi) / 2.0, gain));
            }
        }
    }

    best.map(|(f, t, _)| (f, t))
}

fn predict_row(node: &TreeNode, row: ArrayView1<'_, f64>) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
        } => {
            if row[*feature_idx] <= *threshold {
                predict_row(left, row)
            } else {
                predict_row(right, row)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_separable_data_fits_exactly() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 1.0], [4.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut tree = DecisionTreeClassifier::new(None, 2);
        tree.fit(&x, &y, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_stump_threshold_is_midpoint() {
        let x = Array2::from_shape_fn((100, 1), |(i, _)| i as f64);
        let mut y = Array1::from_shape_fn(100, |i| if i >= 50 { 1.0 } else { 0.0 });
        y[10] = 1.0;
        let mut tree = DecisionTreeClassifier::new(Some(1), 2);
        tree.fit(&x, &y, &mut StdRng::seed_from_u64(0)).unwrap();

        let preds = tree.predict(&array![[49.0], [49.6], [10.0]]).unwrap();
        assert_eq!(preds, array![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = Array2::from_shape_fn((16, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(16, |i| (i % 2) as f64);
        let mut tree = DecisionTreeClassifier::new(Some(2), 2);
        tree.fit(&x, &y, &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let tree = DecisionTreeClassifier::new(None, 2);
        assert!(tree.predict(&array![[1.0]]).is_err());
    }
}
