//! Dense linear algebra for covariance matrices, backed by `faer`.
//!
//! Densities and conditionals go through a Cholesky factorization:
//!
//! ```text
//! Σ = L Lᵀ
//! log |Σ| = 2 Σᵢ ln Lᵢᵢ
//! (x - μ)ᵀ Σ⁻¹ (x - μ) = (x - μ) · Σ⁻¹ (x - μ)
//! ```

use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// ln(2π)
const LN_2PI: f64 = 1.837_877_066_409_345_5;

fn to_mat(a: ArrayView2<'_, f64>) -> Mat<f64> {
    Mat::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn to_column(b: ArrayView1<'_, f64>) -> Mat<f64> {
    Mat::from_fn(b.len(), 1, |i, _| b[i])
}

/// Cholesky factorization of a symmetric positive definite matrix.
#[derive(Debug, Clone)]
pub(crate) struct Cholesky {
    llt: Llt<f64>,
    log_det: f64,
}

impl Cholesky {
    /// Factor `a`. `None` unless `a` is finite and positive definite.
    pub(crate) fn new(a: ArrayView2<'_, f64>) -> Option<Self> {
        if a.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let llt = to_mat(a).as_ref().llt(Side::Lower).ok()?;
        let l = llt.L();
        let log_det = 2.0 * (0..l.nrows()).map(|i| l[(i, i)].ln()).sum::<f64>();
        Some(Self { llt, log_det })
    }

    /// Lower factor `L` as an `ndarray` matrix.
    pub(crate) fn lower(&self) -> Array2<f64> {
        let l = self.llt.L();
        Array2::from_shape_fn((l.nrows(), l.ncols()), |(i, j)| l[(i, j)])
    }

    /// Solve `Σ x = b`.
    pub(crate) fn solve(&self, b: ArrayView1<'_, f64>) -> Array1<f64> {
        let x = self.llt.solve(&to_column(b));
        Array1::from_shape_fn(b.len(), |i| x[(i, 0)])
    }

    /// Log density of `N(0, Σ)` at `diff`.
    pub(crate) fn log_density(&self, diff: ArrayView1<'_, f64>) -> f64 {
        let d = diff.len() as f64;
        let mahalanobis = diff.dot(&self.solve(diff));
        -0.5 * (d * LN_2PI + self.log_det + mahalanobis)
    }
}

/// Square root `S` of a positive semi-definite matrix, with `S Sᵀ = a`.
///
/// Built from the symmetric eigendecomposition `a = U Λ Uᵀ` as `U Λ^½`,
/// negative eigenvalues (rounding noise) clamped to zero. Used for
/// sampling, where a rank-deficient covariance is still meaningful.
pub(crate) fn sqrt_semidefinite(a: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = a.nrows();
    match to_mat(a).as_ref().self_adjoint_eigen(Side::Lower) {
        Ok(evd) => {
            let u = evd.U();
            let lambda = evd.S().column_vector();
            Array2::from_shape_fn((n, n), |(i, j)| u[(i, j)] * lambda[j].max(0.0).sqrt())
        }
        Err(_) => Array2::zeros((n, n)),
    }
}

/// Log-sum-exp for numerical stability.
pub(crate) fn logsumexp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    max_val
        + values
            .iter()
            .map(|&v| (v - max_val).exp())
            .sum::<f64>()
            .ln()
}
