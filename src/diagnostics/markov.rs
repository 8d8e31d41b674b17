//! Trend-symbol Markov chain estimated by simulation.
//!
//! Trend-encoding an i.i.d. normal series gives a three-state chain over
//! `{-1, 0, 1}` whose symmetry leaves four free parameters: the frequency
//! `a` of `+1`, and the transition probabilities `b = P(+1 -> +1)`,
//! `c = P(+1 -> -1)` and `d = P(0 -> +1)`.

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::constants::EIGEN_TOLERANCE;
use crate::error::MarkovError;
use crate::pipeline::trend_encode;
use crate::statistics::counter_rng_seed;
use crate::types::{MaskedSeries, Matrix3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Estimated chain parameters for one trend threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionParams {
    /// Frequency of the `+1` symbol.
    pub a: f64,
    /// `P(+1 -> +1)`.
    pub b: f64,
    /// `P(+1 -> -1)`.
    pub c: f64,
    /// `P(0 -> +1)`.
    pub d: f64,
    /// Trend threshold the chain was simulated with.
    pub threshold: f64,
}

/// Row-stochastic transition matrix over states `(+1, 0, -1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionMatrix(pub Matrix3);

impl TransitionMatrix {
    /// `[[b, 1-b-c, c], [d, 1-2d, d], [c, 1-b-c, b]]`.
    ///
    /// # Errors
    ///
    /// Returns [`MarkovError::InvalidParameters`] if an entry leaves [0, 1].
    pub fn from_params(p: &TransitionParams) -> Result<Self, MarkovError> {
        let (b, c, d) = (p.b, p.c, p.d);
        let m = Matrix3::new(
            b,
            1.0 - b - c,
            c,
            d,
            1.0 - 2.0 * d,
            d,
            c,
            1.0 - b - c,
            b,
        );
        let in_unit = |v: &f64| v.is_finite() && (-EIGEN_TOLERANCE..=1.0 + EIGEN_TOLERANCE).contains(v);
        if !m.iter().all(in_unit) {
            return Err(MarkovError::InvalidParameters([p.a, b, c, d]));
        }
        Ok(Self(m))
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix3 {
        &self.0
    }
}

/// Simulate `steps + 2` standard normals and estimate the chain.
///
/// # Errors
///
/// Returns [`MarkovError::UnvisitedState`] when the walk never produced a
/// `+1` symbol, or never produced a `0` symbol.
pub fn simulate_transitions<R: Rng + ?Sized>(
    threshold: f64,
    steps: usize,
    rng: &mut R,
) -> Result<TransitionParams, MarkovError> {
    let draws: Vec<f64> = (0..steps + 2).map(|_| rng.sample(StandardNormal)).collect();
    let symbols = trend_encode(&MaskedSeries::from_values(&draws), threshold).filled(0.0);

    let (mut up_up, mut up_down, mut flat_up) = (0usize, 0usize, 0usize);
    for w in symbols.windows(2) {
        match (w[0] as i8, w[1] as i8) {
            (1, 1) => up_up += 1,
            (1, -1) => up_down += 1,
            (0, 1) => flat_up += 1,
            _ => {}
        }
    }

    let total = symbols.len() as f64;
    let a = symbols.iter().filter(|&&s| s == 1.0).count() as f64 / total;
    if a == 0.0 {
        return Err(MarkovError::UnvisitedState(1));
    }
    if 1.0 - 2.0 * a <= 0.0 {
        return Err(MarkovError::UnvisitedState(0));
    }
    let n = steps as f64;
    Ok(TransitionParams {
        a,
        b: up_up as f64 / n / a,
        c: up_down as f64 / n / a,
        d: flat_up as f64 / n / (1.0 - 2.0 * a),
        threshold,
    })
}

/// Average of `reps` independent simulations, each with its own seeded stream.
///
/// # Errors
///
/// Propagates the first simulation failure.
pub fn estimate_transitions(
    reps: usize,
    threshold: f64,
    steps: usize,
    seed: u64,
) -> Result<TransitionParams, MarkovError> {
    let one = |rep: usize| {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(seed, rep as u64));
        simulate_transitions(threshold, steps, &mut rng)
    };

    #[cfg(feature = "parallel")]
    let runs: Vec<TransitionParams> = crate::thread_pool::install(|| {
        (0..reps).into_par_iter().map(one).collect::<Result<_, _>>()
    })?;

    #[cfg(not(feature = "parallel"))]
    let runs: Vec<TransitionParams> = (0..reps).map(one).collect::<Result<_, _>>()?;

    let k = runs.len().max(1) as f64;
    let sum = |f: fn(&TransitionParams) -> f64| runs.iter().map(f).sum::<f64>() / k;
    Ok(TransitionParams {
        a: sum(|p| p.a),
        b: sum(|p| p.b),
        c: sum(|p| p.c),
        d: sum(|p| p.d),
        threshold,
    })
}

/// Closed-form variance of the trend statistic from the chain parameters.
pub fn closed_form_variance(p: &TransitionParams) -> f64 {
    let (b, c, d) = (p.b, p.c, p.d);
    let lead = -d / (-1.0 + b + c - 2.0 * d);
    let diff2 = (b - c).powi(2);
    4.0 * lead * lead * (1.0 + 2.0 * diff2 / (1.0 - diff2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_parameters_are_probabilities() {
        let p = estimate_transitions(4, 0.5, 5_000, 42).unwrap();
        for v in [p.a, p.b, p.c, p.d] {
            assert!((0.0..=1.0).contains(&v), "{p:?}");
        }
        // +1 and -1 are equally likely, so a < 1/2 whenever 0 occurs
        assert!(p.a > 0.1 && p.a < 0.5);
        assert!(TransitionMatrix::from_params(&p).is_ok());
    }

    #[test]
    fn estimate_is_reproducible() {
        let first = estimate_transitions(3, 0.5, 2_000, 7).unwrap();
        let second = estimate_transitions(3, 0.5, 2_000, 7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rows_are_stochastic() {
        let p = TransitionParams {
            a: 0.3,
            b: 0.4,
            c: 0.2,
            d: 0.25,
            threshold: 0.5,
        };
        let m = TransitionMatrix::from_params(&p).unwrap();
        for row in m.matrix().row_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn invalid_parameters_rejected() {
        let p = TransitionParams {
            a: 0.3,
            b: 0.8,
            c: 0.5,
            d: 0.1,
            threshold: 0.5,
        };
        assert!(matches!(
            TransitionMatrix::from_params(&p),
            Err(MarkovError::InvalidParameters(_))
        ));
    }
}
