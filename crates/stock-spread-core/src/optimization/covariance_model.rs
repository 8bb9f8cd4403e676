use nalgebra::{DMatrix, DVector};

use crate::data::Asset;

/// Smallest variance handed to the solver.
pub const VARIANCE_FLOOR: f64 = 1e-12;

/// Covariance matrix the optimizer works with, built from each asset's own
/// standard deviation and one assumed cross-correlation. It does not use the
/// empirical pairwise estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceModel {
    matrix: DMatrix<f64>,
}

impl CovarianceModel {
    /// `Sigma[i][i] = std_i^2`, `Sigma[i][j] = rho * std_i * std_j`.
    pub fn from_assets(assets: &[Asset], correlation: f64) -> Self {
        let n = assets.len();
        let stds: Vec<f64> = assets.iter().map(|a| a.standard_deviation).collect();
        let matrix = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                stds[i] * stds[i]
            } else {
                correlation * stds[i] * stds[j]
            }
        });
        CovarianceModel { matrix }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// The matrix with zero variances lifted to [`VARIANCE_FLOOR`], so that
    /// riskless assets do not make the solver's KKT systems singular.
    pub fn regularized(&self) -> DMatrix<f64> {
        let mut m = self.matrix.clone();
        for i in 0..m.nrows() {
            if m[(i, i)] < VARIANCE_FLOOR {
                m[(i, i)] = VARIANCE_FLOOR;
            }
        }
        m
    }

    /// `w' Sigma w`
    pub fn variance(&self, weights: &DVector<f64>) -> f64 {
        weights.dot(&(&self.matrix * weights))
    }

    /// `sqrt(w' Sigma w)`, with round-off below zero treated as zero.
    pub fn std(&self, weights: &DVector<f64>) -> f64 {
        self.variance(weights).max(0.0).sqrt()
    }
}
