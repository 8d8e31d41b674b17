//! Theoretical p-values for the local-similarity range statistic.
//!
//! Under the null, the normalized maximal local similarity behaves like the
//! range of a driftless random walk. Its two-tailed tail probability has a
//! cosine-series CDF; the table stores `P(X >= x)` for every quantized
//! `x = key / 10^decimals` so each pair costs one lookup.

use tracing::info;

use crate::constants::{KCUT_MIN, PI_SQUARED, RMAX_MAX, RMAX_MIN};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Hard ceiling on the series truncation order.
const KCUT_MAX: usize = 1_000_000;

/// Dense table of tail probabilities indexed by quantized statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct PValueTable {
    values: Vec<f64>,
    decimals: u32,
    range: usize,
    delay_limit: usize,
}

/// Inputs of a table lookup for one aligned pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeStatistic {
    /// Alignment score (normalized by `length`).
    pub score: f64,
    /// Series length `N` the oracle saw.
    pub length: usize,
    /// Per-series standard deviation.
    pub sd: f64,
    /// Replicate count `M`.
    pub replicates: usize,
    /// Zero-occurrence correction of the first series.
    pub alpha: f64,
    /// Zero-occurrence correction of the second series.
    pub beta: f64,
}

impl RangeStatistic {
    /// Statistic with unit corrections.
    pub fn new(score: f64, length: usize, sd: f64, replicates: usize) -> Self {
        Self {
            score,
            length,
            sd,
            replicates,
            alpha: 1.0,
            beta: 1.0,
        }
    }

    /// Scaled statistic `R * M / (sd * sqrt(alpha * beta * N))` with `R = |score| * N`.
    pub fn scaled(&self) -> f64 {
        let n = self.length as f64;
        let range = self.score.abs() * n;
        range * self.replicates as f64 / (self.sd * (self.alpha * self.beta * n).sqrt())
    }
}

impl PValueTable {
    /// Build the table for series of length `max_range` and delays up to `delay_limit`.
    ///
    /// `max_range` is clamped into `[RMAX_MIN, RMAX_MAX]`. `precision` is the
    /// target tail error driving the truncation order.
    pub fn build(max_range: usize, delay_limit: usize, precision: f64, decimals: u32) -> Self {
        let range = max_range.clamp(RMAX_MIN, RMAX_MAX);
        let scale = 10f64.powi(decimals as i32);
        let max_key = range * 10usize.pow(decimals);
        info!(range, delay_limit, decimals, keys = max_key + 1, "building theoretical p-value table");

        let tail = |xi: usize| tail_probability(xi as f64 / scale, delay_limit, precision);

        #[cfg(feature = "parallel")]
        let mut values: Vec<f64> =
            crate::thread_pool::install(|| (0..=max_key).into_par_iter().map(tail).collect());

        #[cfg(not(feature = "parallel"))]
        let mut values: Vec<f64> = (0..=max_key).map(tail).collect();

        // Truncation noise can break monotonicity in the far tail.
        let mut floor = 1.0f64;
        for v in values.iter_mut() {
            floor = floor.min(*v);
            *v = floor;
        }

        Self {
            values,
            decimals,
            range,
            delay_limit,
        }
    }

    /// Tabulated probability at `key`, `None` past the end.
    pub fn get(&self, key: usize) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Largest key in the table.
    pub fn max_key(&self) -> usize {
        self.values.len() - 1
    }

    /// Clamped range the table was built for.
    pub fn range(&self) -> usize {
        self.range
    }

    /// Delay limit the table was built for.
    pub fn delay_limit(&self) -> usize {
        self.delay_limit
    }

    /// Quantization decimals.
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// p-value of an observed statistic.
    ///
    /// Keys past the table give 0. A non-finite, negative or overflowing key
    /// gives `None`.
    pub fn lookup(&self, stat: &RangeStatistic) -> Option<f64> {
        let raw = (stat.scaled() * 10f64.powi(self.decimals as i32)).round();
        if !raw.is_finite() || raw < 0.0 || raw >= usize::MAX as f64 {
            return None;
        }
        let key = raw as usize;
        Some(self.get(key).unwrap_or(0.0))
    }
}

/// Two-tailed `P(X >= x)` by the truncated cosine series.
fn tail_probability(x: f64, delay_limit: usize, precision: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let b = (2 * delay_limit + 1) as f64;
    let xx = x * x;
    let pipi_over_xx = PI_SQUARED / xx;
    let kcut = truncation_order(b, xx, pipi_over_xx, precision);

    let a = 1.0 / xx;
    let mut root_cdf = 0.0;
    let mut p = 1.0;
    for k in 1..=kcut {
        let c = ((2 * k - 1) as f64).powi(2);
        root_cdf += (a + 1.0 / (PI_SQUARED * c)) * (-c * pipi_over_xx / 2.0).exp();
        let current = 1.0 - 8f64.powf(b) * root_cdf.powf(b);
        if current < 0.0 {
            break;
        }
        p = current;
    }
    p
}

fn truncation_order(b: f64, xx: f64, pipi_over_xx: f64, precision: f64) -> usize {
    let inner = (precision / (2f64.powf(b) - 1.0)).powf(1.0 / b)
        * xx
        * (1.0 - (-pipi_over_xx).exp())
        / 8.0
        / 2.0;
    let k = (0.5 - inner.ln() / pipi_over_xx).ceil();
    if k.is_finite() && k > 0.0 {
        (k as usize).clamp(KCUT_MIN, KCUT_MAX)
    } else {
        KCUT_MIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> PValueTable {
        PValueTable::build(10, 1, 0.001, 2)
    }

    #[test]
    fn key_zero_is_one() {
        assert_eq!(small_table().get(0), Some(1.0));
    }

    #[test]
    fn range_is_clamped() {
        let t = PValueTable::build(3, 0, 0.001, 1);
        assert_eq!(t.range(), RMAX_MIN);
        assert_eq!(t.max_key(), RMAX_MIN * 10);
        let t = PValueTable::build(500, 0, 0.001, 0);
        assert_eq!(t.range(), RMAX_MAX);
    }

    #[test]
    fn values_are_monotone_probabilities() {
        let t = small_table();
        let mut prev = 1.0;
        for key in 0..=t.max_key() {
            let v = t.get(key).unwrap();
            assert!((0.0..=1.0).contains(&v));
            assert!(v <= prev);
            prev = v;
        }
        // large statistics are very unlikely
        assert!(t.get(t.max_key()).unwrap() < 0.01);
        assert!(t.get(50).unwrap() > 0.5);
    }

    #[test]
    fn larger_delay_is_less_significant() {
        let narrow = PValueTable::build(10, 0, 0.001, 2);
        let wide = PValueTable::build(10, 3, 0.001, 2);
        let key = 150;
        assert!(wide.get(key).unwrap() >= narrow.get(key).unwrap());
    }

    #[test]
    fn lookup_edges() {
        let t = small_table();
        let zero = RangeStatistic::new(0.0, 20, 1.0, 1);
        assert_eq!(t.lookup(&zero), Some(1.0));

        let huge = RangeStatistic::new(50.0, 20, 1.0, 1);
        assert_eq!(t.lookup(&huge), Some(0.0));

        let undefined = RangeStatistic::new(0.5, 20, 0.0, 1);
        assert_eq!(t.lookup(&undefined), None);

        let nan = RangeStatistic::new(f64::NAN, 20, 1.0, 1);
        assert_eq!(t.lookup(&nan), None);
    }

    #[test]
    fn scaled_statistic() {
        // R = 0.5 * 16 = 8, M = 2, sd = 2, N = 16 -> 8 * 2 / (2 * 4) = 2
        let s = RangeStatistic::new(-0.5, 16, 2.0, 2);
        assert!((s.scaled() - 2.0).abs() < 1e-12);
    }
}
