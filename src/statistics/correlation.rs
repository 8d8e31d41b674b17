//! Pearson and Spearman correlation with two-tailed p-values.
//!
//! Missing entries are handled pairwise-complete: a timepoint enters only
//! when both series are valid there. Fewer than three complete pairs, or a
//! constant side, leaves the correlation undefined.

use serde::{Deserialize, Serialize};

use super::distribution::students_t_two_tailed;
use crate::pipeline::{rank_values, TieMethod};
use crate::types::MaskedSeries;

/// A correlation coefficient and its two-tailed p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Coefficient in [-1, 1].
    pub r: f64,
    /// Two-tailed p-value.
    pub p: f64,
}

/// The best correlation over a range of time shifts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftedCorrelation {
    /// Coefficient at the chosen shift.
    pub r: f64,
    /// Two-tailed p-value at the chosen shift.
    pub p: f64,
    /// Chosen shift `d`: positive pairs `x[d..]` with `y[..n-d]`.
    pub delay: i64,
}

/// Which coefficient to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationKind {
    /// Linear correlation of the values.
    Pearson,
    /// Linear correlation of the midranks.
    Spearman,
}

impl CorrelationKind {
    /// Correlate two equal-length series over their complete pairs.
    pub fn correlate(self, x: &MaskedSeries, y: &MaskedSeries) -> Option<Correlation> {
        let (xs, ys) = x.paired_complete(y);
        match self {
            Self::Pearson => pearson(&xs, &ys),
            Self::Spearman => spearman(&xs, &ys),
        }
    }

    /// Best correlation over shifts `-max_shift..=max_shift`.
    ///
    /// The shift with the largest `|r|` wins; later shifts win ties.
    pub fn correlate_shifted(
        self,
        x: &MaskedSeries,
        y: &MaskedSeries,
        max_shift: usize,
    ) -> Option<ShiftedCorrelation> {
        let n = x.len().min(y.len());
        let max_shift = max_shift as i64;
        let mut best: Option<ShiftedCorrelation> = None;
        for d in -max_shift..=max_shift {
            let shift = d.unsigned_abs() as usize;
            if shift >= n {
                continue;
            }
            let (xs, ys) = if d < 0 {
                (x.slice(0, n - shift), y.slice(shift, n))
            } else {
                (x.slice(shift, n), y.slice(0, n - shift))
            };
            let Some(c) = self.correlate(&xs, &ys) else {
                continue;
            };
            if best.map_or(true, |b| c.r.abs() >= b.r.abs()) {
                best = Some(ShiftedCorrelation {
                    r: c.r,
                    p: c.p,
                    delay: d,
                });
            }
        }
        best
    }
}

/// Pearson correlation of two equal-length slices.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<Correlation> {
    let n = x.len();
    if n < 3 || y.len() != n {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let t = if r.abs() >= 1.0 {
        f64::INFINITY
    } else {
        r * (df / (1.0 - r * r)).sqrt()
    };
    let p = students_t_two_tailed(t, df)?;
    Some(Correlation { r, p })
}

/// Spearman correlation (Pearson on midranks).
pub fn spearman(x: &[f64], y: &[f64]) -> Option<Correlation> {
    pearson(
        &rank_values(x, TieMethod::Average),
        &rank_values(y, TieMethod::Average),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_correlation() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 - 2.0 * v).collect();
        let c = pearson(&x, &y).unwrap();
        assert!((c.r + 1.0).abs() < 1e-12);
        assert_eq!(c.p, 0.0);
    }

    #[test]
    fn known_pearson_value() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 5.0];
        let c = pearson(&x, &y).unwrap();
        assert!((c.r - 0.8).abs() < 1e-12);
        // t = 0.8 * sqrt(3 / 0.36) = 2.3094, df = 3
        assert!((c.p - 0.1041).abs() < 1e-3);
    }

    #[test]
    fn spearman_is_rank_based() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 4.0, 9.0, 16.0, 1000.0];
        assert!((spearman(&x, &y).unwrap().r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn undefined_cases() {
        assert!(pearson(&[1.0, 2.0], &[1.0, 2.0]).is_none());
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn missing_pairs_dropped() {
        let x = MaskedSeries::from_values(&[1.0, f64::NAN, 3.0, 4.0, 5.0]);
        let y = MaskedSeries::from_values(&[2.0, 9.0, 6.0, f64::NAN, 10.0]);
        let c = CorrelationKind::Pearson.correlate(&x, &y).unwrap();
        assert!((c.r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn shift_search_finds_lag() {
        let base = [0.3, -1.2, 2.0, 0.7, -0.4, 1.5, -2.2, 0.9, 0.1, -0.8];
        let x = MaskedSeries::from_values(&base);
        // y[t] = x[t - 2]
        let mut lagged = vec![0.0, 0.0];
        lagged.extend_from_slice(&base[..8]);
        let y = MaskedSeries::from_values(&lagged);
        let s = CorrelationKind::Pearson.correlate_shifted(&x, &y, 3).unwrap();
        assert_eq!(s.delay, -2);
        assert!((s.r - 1.0).abs() < 1e-12);
    }
}
