//! Verified eigen-decomposition of the trend transition matrix.
//!
//! Eigenvalues come from the real Schur form; eigenvectors are the null
//! spaces of `T - lambda I` (right) and its transpose (left), read off the
//! smallest singular direction. After normalization the decomposition must
//! satisfy `r0 = (1, 1, 1)`, `sum(l0) = 1` and `L^T R = I`; any violation is
//! an error, so no variance is ever computed from a bad decomposition.

use crate::constants::EIGEN_TOLERANCE;
use crate::error::MarkovError;
use crate::types::{Matrix3, Vector3};

use super::markov::TransitionMatrix;

/// Iteration cap for the null-space SVD; non-finite input never converges.
const SVD_MAX_ITERATIONS: usize = 1000;

/// Eigenvalues with bi-orthonormal left and right eigenvectors.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    /// Eigenvalues; index 0 is the unit eigenvalue.
    pub values: Vector3,
    /// Left eigenvectors as columns; column 0 is the stationary distribution.
    pub left: Matrix3,
    /// Right eigenvectors as columns; column 0 is `(1, 1, 1)`.
    pub right: Matrix3,
}

/// Unit vector spanning the (numerical) null space of `m`.
fn null_vector(m: Matrix3, index: usize) -> Result<Vector3, MarkovError> {
    let missing = MarkovError::NullSpace { index };
    let svd = m
        .try_svd(false, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| missing.clone())?;
    let v_t = svd.v_t.ok_or_else(|| missing.clone())?;
    let (idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .ok_or_else(|| missing.clone())?;
    let v: Vector3 = v_t.row(idx).transpose();
    if v.iter().all(|x| x.is_finite()) {
        Ok(v)
    } else {
        Err(missing)
    }
}

/// Decompose `t` and verify the normalization invariants.
///
/// # Errors
///
/// Returns a [`MarkovError`] naming the first invariant that fails.
pub fn eigen_decompose(t: &TransitionMatrix) -> Result<EigenDecomposition, MarkovError> {
    let m = *t.matrix();
    let mut values = m.eigenvalues().ok_or(MarkovError::ComplexSpectrum)?;

    let unit = values
        .iter()
        .position(|v| (v - 1.0).abs() < EIGEN_TOLERANCE)
        .ok_or(MarkovError::NoUnitEigenvalue([values[0], values[1], values[2]]))?;
    values.swap_rows(0, unit);

    let mut left = Matrix3::zeros();
    let mut right = Matrix3::zeros();
    for i in 0..3 {
        let shifted = m - Matrix3::identity() * values[i];
        let r = null_vector(shifted, i)?;
        let l = null_vector(shifted.transpose(), i)?;
        right.set_column(i, &r);
        left.set_column(i, &l);
    }

    right.set_column(0, &Vector3::repeat(1.0));
    let total = left.column(0).sum();
    if total.abs() < EIGEN_TOLERANCE || !total.is_finite() {
        return Err(MarkovError::Normalization { index: 0, scale: total });
    }
    let stationary = left.column(0) / total;
    left.set_column(0, &stationary);
    for i in 1..3 {
        let scale = left.column(i).dot(&right.column(i));
        if scale.abs() < EIGEN_TOLERANCE || !scale.is_finite() {
            return Err(MarkovError::Normalization { index: i, scale });
        }
        let scaled = left.column(i) / scale;
        left.set_column(i, &scaled);
    }

    let decomposition = EigenDecomposition {
        values,
        left,
        right,
    };
    decomposition.verify()?;
    Ok(decomposition)
}

impl EigenDecomposition {
    /// Check the unit eigenvalue, the stationary sum and `L^T R = I`.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn verify(&self) -> Result<(), MarkovError> {
        let v = &self.values;
        if (v[0] - 1.0).abs() >= EIGEN_TOLERANCE {
            return Err(MarkovError::NoUnitEigenvalue([v[0], v[1], v[2]]));
        }
        let sum = self.left.column(0).sum();
        if (sum - 1.0).abs() >= EIGEN_TOLERANCE {
            return Err(MarkovError::Stationary(sum));
        }
        let gram = self.left.transpose() * self.right;
        for row in 0..3 {
            for col in 0..3 {
                let expected = if row == col { 1.0 } else { 0.0 };
                let value = gram[(row, col)];
                if (value - expected).abs() >= EIGEN_TOLERANCE {
                    return Err(MarkovError::NotBiorthonormal { row, col, value });
                }
            }
        }
        Ok(())
    }

    /// Stationary distribution over `(+1, 0, -1)`.
    pub fn stationary(&self) -> Vector3 {
        self.left.column(0).into_owned()
    }
}

/// Asymptotic variance of the trend statistic from a verified decomposition.
pub fn trend_variance(e: &EigenDecomposition) -> f64 {
    let phi = e.left[(0, 0)];
    let w1 = e.values[1];
    let w2 = e.values[2];
    let a = (e.right[(0, 1)] - e.right[(2, 1)]) * (e.left[(0, 1)] - e.left[(2, 1)]);
    let b = (e.right[(0, 2)] - e.right[(2, 2)]) * (e.left[(0, 2)] - e.left[(2, 2)]);
    4.0 * phi * phi
        + 2.0
            * phi
            * phi
            * (a * a * w1 * w1 / (1.0 - w1 * w1)
                + 2.0 * a * b * w1 * w2 / (1.0 - w1 * w2)
                + b * b * w2 * w2 / (1.0 - w2 * w2))
}
