//! Distribution drift between two splits, one two-sample KS test per column.

use crate::data::source::DataBatch;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result of a two-sample Kolmogorov-Smirnov test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsOutcome {
    /// Largest distance between the two empirical CDFs.
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample KS test with asymptotic p-values.
#[derive(Debug, Clone, Copy)]
pub struct KolmogorovSmirnovTest {
    /// p-values below this mark a column as drifted.
    alpha: f64,
}

impl KolmogorovSmirnovTest {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Compare two samples. Either side empty means there is nothing to compare,
    /// reported as statistic 0 and p-value 1.
    pub fn test(&self, reference: &[f64], current: &[f64]) -> KsOutcome {
        if reference.is_empty() || current.is_empty() {
            return KsOutcome {
                statistic: 0.0,
                p_value: 1.0,
            };
        }

        let mut a = reference.to_vec();
        let mut b = current.to_vec();
        a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));
        b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));

        let statistic = ks_statistic(&a, &b);
        let (n1, n2) = (a.len() as f64, b.len() as f64);
        let en = (n1 * n2 / (n1 + n2)).sqrt();
        let p_value = kolmogorov_survival((en + 0.12 + 0.11 / en) * statistic);

        KsOutcome { statistic, p_value }
    }

    pub fn is_drift(&self, outcome: &KsOutcome) -> bool {
        outcome.p_value < self.alpha
    }
}

impl Default for KolmogorovSmirnovTest {
    fn default() -> Self {
        Self::new(0.05)
    }
}

/// Sup-distance between the ECDFs of two sorted samples.
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d = 0.0f64;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }
    d
}

/// Q_KS(lambda) = 2 * sum_{k>=1} (-1)^(k-1) exp(-2 k^2 lambda^2)
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut sum = 0.0;
    let mut sign = 1.0;
    let mut prev_term = 0.0f64;
    for k in 1..=100 {
        let kf = k as f64;
        let term = sign * 2.0 * (a2 * kf * kf).exp();
        sum += term;
        if term.abs() <= 1e-10 * prev_term.abs() || term.abs() <= 1e-12 * sum.abs() {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        prev_term = term;
    }
    // Series failed to converge, only happens for tiny lambda.
    1.0
}

/// Drift result for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub column: String,
    pub statistic: f64,
    pub p_value: f64,
    pub drift_status: bool,
}

/// Per-column drift report written by the validation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub drift_threshold: f64,
    pub drift_detected: bool,
    pub columns: Vec<ColumnDrift>,
}

impl DriftReport {
    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.drift_status)
            .map(|c| c.column.as_str())
            .collect()
    }
}

/// Test every named column of `base` against the same column of `current`.
/// Columns absent from either batch are skipped.
pub fn detect_dataset_drift(
    base: &DataBatch,
    current: &DataBatch,
    columns: &[&str],
    ks: &KolmogorovSmirnovTest,
) -> DriftReport {
    let mut results = Vec::with_capacity(columns.len());
    for &name in columns {
        let (Some(bi), Some(ci)) = (base.column_index(name), current.column_index(name)) else {
            continue;
        };
        let outcome = ks.test(&base.numeric_values(bi), &current.numeric_values(ci));
        results.push(ColumnDrift {
            column: name.to_string(),
            statistic: outcome.statistic,
            p_value: outcome.p_value,
            drift_status: ks.is_drift(&outcome),
        });
    }

    DriftReport {
        drift_threshold: ks.alpha(),
        drift_detected: results.iter().any(|c| c.drift_status),
        columns: results,
    }
}
