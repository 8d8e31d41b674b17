//! Storey q-values with a smoothed null-proportion estimate.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::QValueEstimator;
use crate::constants::{PI0_BOOTSTRAP_RESAMPLES, PI0_SMOOTH_DF, Q_LAMBDA_MAX, Q_LAMBDA_STEP};
use crate::pipeline::{rank_values, TieMethod};
use crate::statistics::{non_increasing, smoothing_spline};

/// Fallback null proportion when both estimators collapse to zero.
const PI0_FLOOR: f64 = Q_LAMBDA_STEP;

/// Which stage of the cascade produced pi0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pi0Method {
    /// Monotone smoothing spline over the lambda grid.
    Smoother,
    /// Bootstrap choice of lambda.
    Bootstrap,
    /// Fixed constant after both estimators degenerated.
    Floor,
}

/// Estimated proportion of true nulls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pi0Estimate {
    /// pi0 in (0, 1].
    pub pi0: f64,
    /// Stage that produced it.
    pub method: Pi0Method,
}

/// Storey's q-value estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreyQValue {
    /// Use the small-p robust denominator `rank * (1 - (1 - p)^n)`.
    pub robust: bool,
    /// Seed of the bootstrap pi0 fallback.
    pub seed: u64,
}

impl Default for StoreyQValue {
    fn default() -> Self {
        Self {
            robust: false,
            seed: 0x5EED,
        }
    }
}

/// The lambda grid `0, 0.05, ..., 0.90`.
pub fn lambda_grid() -> Vec<f64> {
    (0..)
        .map(|k| k as f64 * Q_LAMBDA_STEP)
        .take_while(|l| *l < Q_LAMBDA_MAX - 1e-9)
        .collect()
}

fn pi0_at(p: &[f64], lambda: f64) -> f64 {
    let above = p.iter().filter(|&&v| v >= lambda).count();
    above as f64 / p.len() as f64 / (1.0 - lambda)
}

impl StoreyQValue {
    /// Estimate pi0 from valid p-values over `lambdas` (all below `max(p)`).
    pub fn estimate_pi0(&self, p: &[f64], lambdas: &[f64]) -> Pi0Estimate {
        let pi0s: Vec<f64> = lambdas.iter().map(|&l| pi0_at(p, l)).collect();

        let smoothed = smoothing_spline(lambdas, &pi0s, PI0_SMOOTH_DF)
            .map(|fit| non_increasing(&fit))
            .and_then(|fit| fit.last().copied())
            .filter(|v| v.is_finite())
            .map_or(0.0, |v| v.clamp(0.0, 1.0));
        self.resolve_pi0(smoothed, p, lambdas, &pi0s)
    }

    /// Fallback cascade after the smoother: bootstrap, then the floor.
    fn resolve_pi0(&self, smoothed: f64, p: &[f64], lambdas: &[f64], pi0s: &[f64]) -> Pi0Estimate {
        if smoothed > 0.0 {
            debug!(pi0 = smoothed, "pi0 from smoother");
            return Pi0Estimate {
                pi0: smoothed,
                method: Pi0Method::Smoother,
            };
        }

        warn!("pi0 smoother degenerated, falling back to bootstrap");
        let boot = self.bootstrap_pi0(p, lambdas, pi0s);
        if boot > 0.0 {
            debug!(pi0 = boot, "pi0 from bootstrap");
            return Pi0Estimate {
                pi0: boot,
                method: Pi0Method::Bootstrap,
            };
        }

        warn!(pi0 = PI0_FLOOR, "pi0 bootstrap degenerated, using floor");
        Pi0Estimate {
            pi0: PI0_FLOOR,
            method: Pi0Method::Floor,
        }
    }

    fn bootstrap_pi0(&self, p: &[f64], lambdas: &[f64], pi0s: &[f64]) -> f64 {
        let floor = pi0s.iter().copied().fold(f64::INFINITY, f64::min);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut mse = vec![0.0; lambdas.len()];
        let mut resample = vec![0.0; p.len()];
        for _ in 0..PI0_BOOTSTRAP_RESAMPLES {
            for slot in resample.iter_mut() {
                *slot = p[rng.random_range(0..p.len())];
            }
            for (acc, &lambda) in mse.iter_mut().zip(lambdas) {
                *acc += (pi0_at(&resample, lambda) - floor).powi(2);
            }
        }
        let best = mse
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i);
        pi0s.get(best).copied().unwrap_or(0.0).clamp(0.0, 1.0)
    }
}

impl QValueEstimator for StoreyQValue {
    fn q_values(&self, p_values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut out = vec![None; p_values.len()];
        let (index, p): (Vec<usize>, Vec<f64>) = p_values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
            .unzip();
        let n = p.len();
        if n < 2 {
            return out;
        }

        let p_max = p.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lambdas: Vec<f64> = lambda_grid().into_iter().filter(|&l| l < p_max).collect();
        if lambdas.len() <= 1 {
            for &i in &index {
                out[i] = Some(0.0);
            }
            return out;
        }

        let pi0 = self.estimate_pi0(&p, &lambdas).pi0;
        let ranks = rank_values(&p, TieMethod::Max);
        let nf = n as f64;
        let mut q: Vec<f64> = p
            .iter()
            .zip(&ranks)
            .map(|(&pv, &rank)| {
                if self.robust {
                    if pv == 0.0 {
                        0.0
                    } else {
                        pi0 * nf * pv / (rank * (1.0 - (1.0 - pv).powf(nf)))
                    }
                } else {
                    pi0 * nf * pv / rank
                }
            })
            .collect();

        // largest p first, carrying the running minimum
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| p[b].total_cmp(&p[a]));
        let mut running = 1.0f64;
        for &k in &order {
            running = running.min(q[k]);
            q[k] = running;
        }

        for (k, &i) in index.iter().enumerate() {
            out[i] = Some(q[k]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(p: &[f64]) -> Vec<Option<f64>> {
        p.iter().copied().map(Some).collect()
    }

    #[test]
    fn grid_has_nineteen_points() {
        let grid = lambda_grid();
        assert_eq!(grid.len(), 19);
        assert!((grid[18] - 0.90).abs() < 1e-12);
    }

    #[test]
    fn fewer_than_two_is_undefined() {
        let est = StoreyQValue::default();
        assert_eq!(est.q_values(&[None, Some(0.3), None]), vec![None, None, None]);
        assert!(est.q_values(&[]).is_empty());
    }

    #[test]
    fn tiny_p_values_give_zero() {
        // max p = 0.04 keeps only lambda = 0
        let est = StoreyQValue::default();
        let q = est.q_values(&[Some(0.01), None, Some(0.04)]);
        assert_eq!(q, vec![Some(0.0), None, Some(0.0)]);
    }

    #[test]
    fn uniform_p_values_have_pi0_near_one() {
        let p: Vec<f64> = (1..=200).map(|i| i as f64 / 201.0).collect();
        let grid: Vec<f64> = lambda_grid();
        let est = StoreyQValue::default().estimate_pi0(&p, &grid);
        assert_eq!(est.method, Pi0Method::Smoother);
        assert!((est.pi0 - 1.0).abs() < 0.1, "pi0 = {}", est.pi0);
    }

    fn grid_pi0s(p: &[f64], lambdas: &[f64]) -> Vec<f64> {
        lambdas.iter().map(|&l| pi0_at(p, l)).collect()
    }

    #[test]
    fn zero_smoother_falls_back_to_bootstrap() {
        let p: Vec<f64> = (1..=60).map(|i| i as f64 / 61.0).collect();
        let grid = lambda_grid();
        let pi0s = grid_pi0s(&p, &grid);
        let est = StoreyQValue::default();

        let first = est.resolve_pi0(0.0, &p, &grid, &pi0s);
        assert_eq!(first.method, Pi0Method::Bootstrap);
        assert!(first.pi0 > 0.0 && first.pi0 <= 1.0);
        assert!(pi0s.iter().any(|v| (v.clamp(0.0, 1.0) - first.pi0).abs() < 1e-12));

        // same seed, same choice
        assert_eq!(est.resolve_pi0(0.0, &p, &grid, &pi0s), first);
    }

    #[test]
    fn empty_tail_reaches_floor() {
        // every lambda lies above every p-value, so pi0(lambda) = 0 throughout
        let p = [0.01, 0.02, 0.03, 0.04];
        let lambdas = [0.5, 0.6, 0.7, 0.8, 0.9];
        let est = StoreyQValue::default().estimate_pi0(&p, &lambdas);
        assert_eq!(est.method, Pi0Method::Floor);
        assert_eq!(est.pi0, PI0_FLOOR);

        let pi0s = grid_pi0s(&p, &lambdas);
        let direct = StoreyQValue::default().resolve_pi0(0.0, &p, &lambdas, &pi0s);
        assert_eq!(direct.method, Pi0Method::Floor);
    }

    #[test]
    fn bootstrap_depends_only_on_seed() {
        let p: Vec<f64> = (0..80).map(|i| ((i * 37) % 80) as f64 / 80.0 + 0.001).collect();
        let grid = lambda_grid();
        let pi0s = grid_pi0s(&p, &grid);
        let a = StoreyQValue { robust: false, seed: 11 };
        let b = StoreyQValue { robust: true, seed: 11 };
        assert_eq!(
            a.bootstrap_pi0(&p, &grid, &pi0s),
            b.bootstrap_pi0(&p, &grid, &pi0s)
        );
    }

    #[test]
    fn q_values_monotone_and_bounded() {
        let p = [0.001, 0.5, 0.02, 0.9, 0.02, 0.3, 0.75, 0.04, 0.6, 0.11];
        let q = StoreyQValue::default().q_values(&some(&p));
        let mut pairs: Vec<(f64, f64)> = p
            .iter()
            .zip(&q)
            .map(|(&pv, qv)| (pv, qv.unwrap()))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            assert!(w[0].1 <= w[1].1 + 1e-12);
        }
        assert!(pairs.iter().all(|(_, q)| (0.0..=1.0).contains(q)));
        // tied p-values share a q-value
        assert_eq!(q[2], q[4]);
    }

    #[test]
    fn robust_variant_handles_zero() {
        let est = StoreyQValue {
            robust: true,
            ..StoreyQValue::default()
        };
        let q = est.q_values(&some(&[0.0, 0.2, 0.5, 0.97]));
        assert_eq!(q[0], Some(0.0));
        assert!(q.iter().all(|v| v.is_some_and(|x| x <= 1.0)));
    }
}
