//! Cubic smoothing spline and isotonic projection.
//!
//! The spline is the penalized least-squares fit in the Green & Silverman
//! (1994) form: with knots at the data points, the fitted values are
//! `f = (I + alpha * K)^-1 y` where `K = Q R^-1 Q^T`. The smoothing level is
//! chosen by matching `trace((I + alpha * K)^-1)` to the requested effective
//! degrees of freedom.

use nalgebra::{DMatrix, DVector};

/// Bisection steps on `log10(alpha)`.
const DF_BISECTION_STEPS: usize = 200;

/// Fitted values of a cubic smoothing spline with `df` effective degrees of freedom.
///
/// `x` must be strictly increasing. With fewer than three points, or
/// `df >= x.len()`, the data are interpolated. Returns `None` when the
/// penalty matrix is singular.
pub fn smoothing_spline(x: &[f64], y: &[f64], df: f64) -> Option<Vec<f64>> {
    let n = x.len();
    if n != y.len() {
        return None;
    }
    if n < 3 || df >= n as f64 {
        return Some(y.to_vec());
    }
    let k = penalty_matrix(x)?;
    let identity = DMatrix::<f64>::identity(n, n);
    let smoother = |log_alpha: f64| (&identity + &k * 10f64.powf(log_alpha)).try_inverse();

    // trace falls from n (alpha -> 0) towards 2 (alpha -> inf)
    let target = df.max(2.0 + 1e-9);
    let (mut lo, mut hi) = (-12.0f64, 12.0f64);
    for _ in 0..DF_BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        let trace = smoother(mid)?.trace();
        if trace > target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-10 {
            break;
        }
    }
    let s = smoother(0.5 * (lo + hi))?;
    let fitted = s * DVector::from_column_slice(y);
    Some(fitted.iter().copied().collect())
}

/// `Q R^-1 Q^T` for knots `x`.
fn penalty_matrix(x: &[f64]) -> Option<DMatrix<f64>> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    if h.iter().any(|&d| d <= 0.0 || !d.is_finite()) {
        return None;
    }
    let m = n - 2;
    let mut q = DMatrix::<f64>::zeros(n, m);
    let mut r = DMatrix::<f64>::zeros(m, m);
    for j in 0..m {
        // column j corresponds to interior knot j + 1
        q[(j, j)] = 1.0 / h[j];
        q[(j + 1, j)] = -1.0 / h[j] - 1.0 / h[j + 1];
        q[(j + 2, j)] = 1.0 / h[j + 1];
        r[(j, j)] = (h[j] + h[j + 1]) / 3.0;
        if j + 1 < m {
            r[(j, j + 1)] = h[j + 1] / 6.0;
            r[(j + 1, j)] = h[j + 1] / 6.0;
        }
    }
    let r_inv = r.cholesky()?.inverse();
    Some(&q * r_inv * q.transpose())
}

/// Least-squares projection onto non-increasing sequences (pool adjacent violators).
pub fn non_increasing(values: &[f64]) -> Vec<f64> {
    // (sum, count) per pooled block
    let mut blocks: Vec<(f64, usize)> = Vec::with_capacity(values.len());
    for &v in values {
        blocks.push((v, 1));
        while blocks.len() > 1 {
            let (s2, c2) = blocks[blocks.len() - 1];
            let (s1, c1) = blocks[blocks.len() - 2];
            if s1 / c1 as f64 >= s2 / c2 as f64 {
                break;
            }
            blocks.pop();
            let last = blocks.len() - 1;
            blocks[last] = (s1 + s2, c1 + c2);
        }
    }
    blocks
        .into_iter()
        .flat_map(|(s, c)| std::iter::repeat(s / c as f64).take(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_is_preserved() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.05).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.0 - 0.5 * v).collect();
        let fit = smoothing_spline(&x, &y, 3.0).unwrap();
        for (f, t) in fit.iter().zip(&y) {
            assert!((f - t).abs() < 1e-6);
        }
    }

    #[test]
    fn smoothing_reduces_roughness() {
        let x: Vec<f64> = (0..19).map(|i| i as f64 * 0.05).collect();
        let y: Vec<f64> = (0..19)
            .map(|i| 0.8 + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let fit = smoothing_spline(&x, &y, 3.0).unwrap();
        let rough = |v: &[f64]| v.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>();
        assert!(rough(&fit) < rough(&y) / 4.0);
    }

    #[test]
    fn few_points_interpolate() {
        assert_eq!(
            smoothing_spline(&[0.0, 0.05], &[0.9, 0.7], 3.0),
            Some(vec![0.9, 0.7])
        );
    }

    #[test]
    fn pava_pools_violators() {
        assert_eq!(non_increasing(&[3.0, 1.0, 2.0, 0.0]), vec![3.0, 1.5, 1.5, 0.0]);
        assert_eq!(non_increasing(&[1.0, 2.0, 3.0]), vec![2.0, 2.0, 2.0]);
        assert!(non_increasing(&[]).is_empty());
    }
}
