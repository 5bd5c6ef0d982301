//! KNN-based imputation.
//!
//! Fitting and transforming are split across two types. [`KnnImputer`] only knows
//! its hyperparameters and is consumed by [`KnnImputer::fit_transform`]; the
//! returned [`FittedKnnImputer`] can only transform. An imputer therefore gets fit
//! exactly once, on whatever matrix is handed to `fit_transform`.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Unfitted KNN imputer with uniform neighbor weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
}

impl KnnImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Learn from `x` and impute it in one go.
    pub fn fit_transform(self, x: &Array2<f64>) -> Result<(FittedKnnImputer, Array2<f64>)> {
        if x.nrows() == 0 {
            return Err(PipelineError::invalid_data(
                "cannot fit imputer on an empty training matrix",
            ));
        }

        let column_means = x
            .axis_iter(Axis(1))
            .map(|col| {
                let (sum, count) = col
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
                if count == 0 {
                    tracing::warn!("feature column has no observed values, imputing 0.0");
                    0.0
                } else {
                    sum / count as f64
                }
            })
            .collect::<Array1<f64>>();

        let fitted = FittedKnnImputer {
            n_neighbors: self.n_neighbors,
            reference: x.clone(),
            column_means,
        };
        let imputed = fitted.transform(x)?;
        Ok((fitted, imputed))
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(3)
    }
}

/// KNN imputer state learned from the training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedKnnImputer {
    n_neighbors: usize,
    /// Training rows used as donors. Missing cells are NaN in memory and null on disk.
    #[serde(with = "nan_as_null")]
    reference: Array2<f64>,
    /// Per-column training means, used when a cell has no donor.
    column_means: Array1<f64>,
}

impl FittedKnnImputer {
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn n_features(&self) -> usize {
        self.reference.ncols()
    }

    pub fn reference(&self) -> &Array2<f64> {
        &self.reference
    }

    pub fn column_means(&self) -> &Array1<f64> {
        &self.column_means
    }

    /// Fill every NaN in `x` with the mean of that column over the `k` nearest
    /// donor rows that have the column observed.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(PipelineError::invalid_data(format!(
                "imputer was fit on {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }

        let mut out = x.clone();
        for (r, row) in x.axis_iter(Axis(0)).enumerate() {
            let missing: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_nan())
                .map(|(c, _)| c)
                .collect();
            if missing.is_empty() {
                continue;
            }

            let distances: Vec<f64> = self
                .reference
                .axis_iter(Axis(0))
                .map(|donor| nan_euclidean(row, donor))
                .collect();

            for col in missing {
                out[[r, col]] = self.impute_cell(&distances, col);
            }
        }
        Ok(out)
    }

    fn impute_cell(&self, distances: &[f64], col: usize) -> f64 {
        let mut donors: Vec<(f64, usize)> = distances
            .iter()
            .enumerate()
            .filter(|&(i, d)| d.is_finite() && !self.reference[[i, col]].is_nan())
            .map(|(i, &d)| (d, i))
            .collect();
        if donors.is_empty() {
            return self.column_means[col];
        }

        donors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1)));
        let k = self.n_neighbors.min(donors.len());
        let sum: f64 = donors[..k].iter().map(|&(_, i)| self.reference[[i, col]]).sum();
        sum / k as f64
    }
}

/// Euclidean distance over coordinates present in both rows, scaled up by the
/// fraction of coordinates present. No shared coordinate gives infinity.
fn nan_euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let mut present = 0usize;
    let mut accum = 0.0f64;
    for (&ai, &bi) in a.iter().zip(b.iter()) {
        if ai.is_nan() || bi.is_nan() {
            continue;
        }
        present += 1;
        let d = ai - bi;
        accum += d * d;
    }
    if present == 0 {
        return f64::INFINITY;
    }
    (accum * a.len() as f64 / present as f64).sqrt()
}

mod nan_as_null {
    use ndarray::Array2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &Array2<f64>, s: S) -> Result<S::Ok, S::Error> {
        m.mapv(|v| (!v.is_nan()).then_some(v)).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Array2<f64>, D::Error> {
        let m = Array2::<Option<f64>>::deserialize(d)?;
        Ok(m.mapv(|v| v.unwrap_or(f64::NAN)))
    }
}
