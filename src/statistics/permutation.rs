//! Permutation p-values for alignment scores.
//!
//! The second factor's timepoints are shuffled (all replicates together),
//! the pipeline is re-run on the shuffled copy, and the re-scored
//! alignments form the null distribution.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::alignment::AlignmentOracle;
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::pipeline::Pipeline;
use crate::types::{MaskedSeries, ReplicateMatrix};

/// Inputs shared by one pair's permutation test.
#[derive(Debug, Clone, Copy)]
pub struct PermutationTest<'a> {
    /// Pipeline applied to every shuffled copy.
    pub pipeline: &'a Pipeline,
    /// Largest shift the oracle may use.
    pub delay_limit: usize,
    /// Number of shuffles `P`.
    pub permutations: usize,
}

impl PermutationTest<'_> {
    /// Two-tailed empirical p-value of `observed`.
    ///
    /// `x` is the already-processed first series, `y` the raw second factor.
    /// Counts shuffles with `|s| >= |observed|` (for negative `observed` the
    /// mirrored rule `-|s| <= observed`, which counts the same shuffles).
    /// Returns `Ok(None)` when `permutations` is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires between shuffles.
    pub fn p_value<O, R>(
        &self,
        oracle: &O,
        x: &MaskedSeries,
        y: &ReplicateMatrix,
        observed: f64,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<Option<f64>, Error>
    where
        O: AlignmentOracle + ?Sized,
        R: Rng + ?Sized,
    {
        if self.permutations == 0 {
            return Ok(None);
        }
        let x_values = x.filled(0.0);
        let mut order: Vec<usize> = (0..y.timepoints()).collect();
        let mut shuffled = y.clone();
        let mut extreme = 0usize;

        for _ in 0..self.permutations {
            cancel.check()?;
            order.shuffle(rng);
            y.permute_timepoints_into(&order, &mut shuffled);
            let y_values = self.pipeline.process(&shuffled).filled(0.0);
            let s = oracle.score(&x_values, &y_values, self.delay_limit);
            let hit = if observed >= 0.0 {
                s.abs() >= observed
            } else {
                -s.abs() <= observed
            };
            if hit {
                extreme += 1;
            }
        }
        Ok(Some(extreme as f64 / self.permutations as f64))
    }
}
