//! Statistical methods for local-similarity significance.
//!
//! This module provides the numerical core:
//! - Quantiles and robust scale estimates using O(n) selection
//! - Theoretical tail probabilities of the range statistic
//! - Permutation p-values and replicate-bootstrap confidence intervals
//! - Pearson/Spearman correlation, plain and shift-searched
//! - Smoothing spline and isotonic projection used by the FDR estimator

mod bootstrap;
mod correlation;
mod distribution;
mod permutation;
mod quantile;
mod spline;
mod theoretical;

pub use bootstrap::{
    counter_rng_seed, resample_replicates_into, BootstrapCi, BootstrapInterval, ScoreInterval,
};
pub use correlation::{pearson, spearman, Correlation, CorrelationKind, ShiftedCorrelation};
pub use distribution::{normal_cdf, normal_quantile, students_t_two_tailed};
pub use permutation::PermutationTest;
pub use quantile::{compute_quantile, iqr, mad, mad_sd, mean, median, std_dev};
pub use spline::{non_increasing, smoothing_spline};
pub use theoretical::{PValueTable, RangeStatistic};
