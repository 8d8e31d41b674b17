//! Replicate bootstrap for alignment-score confidence intervals.
//!
//! Each resample draws, independently for every timepoint, a replicate set
//! of the original size with replacement. A drawn missing entry stays
//! missing. Both factors are resampled, re-run through the pipeline and
//! re-scored; the sorted scores give percentile bounds.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::distribution::{normal_cdf, normal_quantile};
use crate::alignment::AlignmentOracle;
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::pipeline::Pipeline;
use crate::types::ReplicateMatrix;

/// Counter-based RNG seed generation using SplitMix64.
///
/// This is a stateless PRF that generates deterministic, well-distributed
/// seeds from a base seed and counter. Each pair of an analysis derives its
/// own stream this way, so results do not depend on scheduling order.
///
/// # Arguments
///
/// * `base_seed` - Base random seed
/// * `counter` - Stream index (0, 1, 2, ...)
///
/// # Returns
///
/// A 64-bit seed suitable for initializing an RNG.
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64, see https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// How bootstrap bounds are read off the sorted scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BootstrapInterval {
    /// Plain percentile bounds.
    #[default]
    Percentile,
    /// Bias-corrected percentile bounds (BC).
    BiasCorrected,
}

/// Point estimate with a confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInterval {
    /// Bootstrap mean, or the observed score when no resampling happened.
    pub estimate: f64,
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl ScoreInterval {
    /// Degenerate interval at `score`.
    pub fn point(score: f64) -> Self {
        Self {
            estimate: score,
            low: score,
            high: score,
        }
    }
}

/// Resample replicates per timepoint into a preallocated matrix.
///
/// # Panics
///
/// Panics if `out` does not have the shape of `data`.
pub fn resample_replicates_into<R: Rng + ?Sized>(
    data: &ReplicateMatrix,
    rng: &mut R,
    out: &mut ReplicateMatrix,
) {
    assert_eq!(
        (out.replicates(), out.timepoints()),
        (data.replicates(), data.timepoints()),
        "Output buffer must have the shape of the input data"
    );
    let m = data.replicates();
    if m == 0 {
        return;
    }
    for t in 0..data.timepoints() {
        for r in 0..m {
            let src = rng.random_range(0..m);
            out.copy_entry_from(r, t, data, src);
        }
    }
}

/// Bootstrap settings for one pair.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapCi<'a> {
    /// Pipeline applied to every resample.
    pub pipeline: &'a Pipeline,
    /// Largest shift the oracle may use.
    pub delay_limit: usize,
    /// Number of resamples `B`.
    pub resamples: usize,
    /// Interval width in (0, 1).
    pub width: f64,
    /// Bound construction.
    pub interval: BootstrapInterval,
}

impl BootstrapCi<'_> {
    /// Confidence interval around `score` for the pair `(x, y)`.
    ///
    /// With a single replicate or zero resamples the interval collapses to
    /// `score`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires between resamples.
    pub fn estimate<O, R>(
        &self,
        oracle: &O,
        x: &ReplicateMatrix,
        y: &ReplicateMatrix,
        score: f64,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<ScoreInterval, Error>
    where
        O: AlignmentOracle + ?Sized,
        R: Rng + ?Sized,
    {
        if self.resamples == 0 || x.replicates() <= 1 {
            return Ok(ScoreInterval::point(score));
        }

        let mut xb = x.clone();
        let mut yb = y.clone();
        let mut scores = Vec::with_capacity(self.resamples);
        for _ in 0..self.resamples {
            cancel.check()?;
            resample_replicates_into(x, rng, &mut xb);
            resample_replicates_into(y, rng, &mut yb);
            let xs = self.pipeline.process(&xb).filled(0.0);
            let ys = self.pipeline.process(&yb).filled(0.0);
            scores.push(oracle.score(&xs, &ys, self.delay_limit));
        }
        scores.sort_by(|a, b| a.total_cmp(b));

        let b = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / b;
        let (mut a1, mut a2) = ((1.0 - self.width) / 2.0, self.width + (1.0 - self.width) / 2.0);
        if self.interval == BootstrapInterval::BiasCorrected {
            let below = scores.iter().filter(|&&s| s <= score).count() as f64;
            let z0 = normal_quantile(below / b);
            if z0.is_finite() {
                a1 = normal_cdf(2.0 * z0 + normal_quantile(a1));
                a2 = normal_cdf(2.0 * z0 + normal_quantile(a2));
            }
        }
        let last = scores.len() as isize - 1;
        let index = |v: f64| (v as isize - 1).clamp(0, last) as usize;
        Ok(ScoreInterval {
            estimate: mean,
            low: scores[index((b * a1).floor())],
            high: scores[index((b * a2).ceil())],
        })
    }
}
