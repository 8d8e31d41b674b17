//! Markov diagnostics for trend-encoded analyses.
//!
//! Trend symbols are serially dependent, so the variance of a trend-based
//! similarity statistic differs from the i.i.d. case. These routines
//! estimate the symbol chain by simulation and derive that variance from a
//! verified eigen-decomposition of its transition matrix.

mod eigen;
mod markov;

pub use eigen::{eigen_decompose, trend_variance, EigenDecomposition};
pub use markov::{
    closed_form_variance, estimate_transitions, simulate_transitions, TransitionMatrix,
    TransitionParams,
};

use crate::error::MarkovError;

/// Simulate the chain for `threshold` and return its trend-statistic variance.
///
/// # Errors
///
/// Fails if the simulation never visits a required state or the
/// eigen-decomposition does not verify.
pub fn simulated_trend_variance(
    threshold: f64,
    reps: usize,
    steps: usize,
    seed: u64,
) -> Result<f64, MarkovError> {
    let params = estimate_transitions(reps, threshold, steps, seed)?;
    let matrix = TransitionMatrix::from_params(&params)?;
    let eigen = eigen_decompose(&matrix)?;
    Ok(trend_variance(&eigen))
}
