//! Configuration for a pairwise local-similarity analysis.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TABLE_DECIMALS, MAX_TABLE_DECIMALS};
use crate::error::ConfigError;
use crate::fdr::{QValueEstimator, StoreyQValue};
use crate::pipeline::{FillMethod, Normalizer, Pipeline, Summarizer};
use crate::statistics::BootstrapInterval;

/// Configuration options for [`PairwiseAnalysis`](crate::PairwiseAnalysis).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which factor pairs are analyzed (default: Auto).
    pub pairing: PairingMode,

    /// Largest time shift the alignment may use (default: 3).
    pub delay_limit: usize,

    /// Minimum fraction of valid, non-zero replicate-averaged timepoints a
    /// factor needs to be analyzed (default: 0.5).
    pub min_occurrence: f64,

    /// Interior gap filling applied to every replicate series before
    /// analysis (default: None).
    pub fill: FillMethod,

    /// Replicate summarization (default: Mean).
    pub summarizer: Summarizer,

    /// Normalization after summarization (default: NoZero).
    pub normalizer: Normalizer,

    /// Trend threshold; `None` analyzes levels rather than trends (default: None).
    pub trend_threshold: Option<f64>,

    /// How alignment p-values are obtained (default: Permutation).
    pub p_value_method: PValueMethod,

    /// Permutations per pair; also sets the theoretical table precision to
    /// `1 / permutations` (default: 1,000).
    pub permutations: usize,

    /// Bootstrap resamples per pair; 0 disables the interval (default: 0).
    pub bootstraps: usize,

    /// Bootstrap confidence width (default: 0.95).
    pub ci_width: f64,

    /// Bootstrap bound construction (default: Percentile).
    pub bootstrap_interval: BootstrapInterval,

    /// Buffered or streaming emission (default: Buffered).
    pub emission: Emission,

    /// Use the robust q-value denominator with the built-in estimator (default: false).
    pub robust_q_values: bool,

    /// Alternate q-value backend; the built-in Storey estimator when `None`.
    #[serde(skip)]
    pub fdr_backend: Option<Arc<dyn QValueEstimator>>,

    /// Base seed for every random stream of the run (default: 0x5EED).
    pub seed: u64,

    /// Approximate per-series variance used by the theoretical lookup (default: 1.0).
    pub approx_variance: f64,

    /// Quantization decimals of the theoretical table (default: 2).
    pub table_decimals: u32,
}

/// Which pairs of factors are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PairingMode {
    /// `OnDiagonal` when both tensors have the same factors, else `Cross`.
    #[default]
    Auto,
    /// Each unordered pair `(i, j)` with `i < j` once.
    OnDiagonal,
    /// Every `(i, j)` of the cross product.
    Cross,
}

/// Source of the alignment p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PValueMethod {
    /// Table lookup only.
    Theoretical,
    /// Permutation test only.
    #[default]
    Permutation,
    /// Table lookup; permutation re-check when the table p-value is promising.
    Mixed,
}

impl PValueMethod {
    fn name(self) -> &'static str {
        match self {
            Self::Theoretical => "theoretical",
            Self::Permutation => "permutation",
            Self::Mixed => "mixed",
        }
    }

    /// Whether a theoretical table is needed.
    pub fn uses_table(self) -> bool {
        matches!(self, Self::Theoretical | Self::Mixed)
    }
}

/// How result rows leave the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Emission {
    /// Collect every row, run FDR, emit once with q-values.
    #[default]
    Buffered,
    /// Flush rows in batches as they complete; q-values stay undefined.
    Streaming {
        /// Rows per flush.
        batch_size: usize,
    },
}

impl Emission {
    /// Whether q-values will be computed.
    pub fn computes_q_values(self) -> bool {
        matches!(self, Self::Buffered)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pairing: PairingMode::Auto,
            delay_limit: 3,
            min_occurrence: 0.5,
            fill: FillMethod::None,
            summarizer: Summarizer::Mean,
            normalizer: Normalizer::NoZero,
            trend_threshold: None,
            p_value_method: PValueMethod::Permutation,
            permutations: 1_000,
            bootstraps: 0,
            ci_width: 0.95,
            bootstrap_interval: BootstrapInterval::Percentile,
            emission: Emission::Buffered,
            robust_q_values: false,
            fdr_backend: None,
            seed: 0x5EED,
            approx_variance: 1.0,
            table_decimals: DEFAULT_TABLE_DECIMALS,
        }
    }
}

impl Config {
    /// Check every parameter range.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_occurrence) {
            return Err(ConfigError::MinOccurrence(self.min_occurrence));
        }
        if !(self.ci_width > 0.0 && self.ci_width < 1.0) {
            return Err(ConfigError::CiWidth(self.ci_width));
        }
        if !(self.approx_variance > 0.0 && self.approx_variance.is_finite()) {
            return Err(ConfigError::ApproxVariance(self.approx_variance));
        }
        if let Some(t) = self.trend_threshold {
            if !(t >= 0.0 && t.is_finite()) {
                return Err(ConfigError::TrendThreshold(t));
            }
        }
        if let Emission::Streaming { batch_size: 0 } = self.emission {
            return Err(ConfigError::BatchSize);
        }
        if self.permutations == 0 && self.p_value_method != PValueMethod::Theoretical {
            return Err(ConfigError::Permutations(self.p_value_method.name()));
        }
        if self.table_decimals > MAX_TABLE_DECIMALS {
            return Err(ConfigError::TableDecimals {
                max: MAX_TABLE_DECIMALS,
                found: self.table_decimals,
            });
        }
        Ok(())
    }

    /// The per-factor pipeline described by this configuration.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline {
            summarizer: self.summarizer,
            normalizer: self.normalizer,
            trend_threshold: self.trend_threshold,
        }
    }

    /// The q-value backend in effect.
    pub fn q_value_estimator(&self) -> Arc<dyn QValueEstimator> {
        match &self.fdr_backend {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(StoreyQValue {
                robust: self.robust_q_values,
                seed: self.seed,
            }),
        }
    }

    /// Target tail precision of the theoretical table.
    pub fn table_precision(&self) -> f64 {
        1.0 / self.permutations.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn invalid_ranges_rejected() {
        let bad = Config {
            min_occurrence: 1.5,
            ..Config::default()
        };
        assert_eq!(bad.validate(), Err(ConfigError::MinOccurrence(1.5)));

        let bad = Config {
            emission: Emission::Streaming { batch_size: 0 },
            ..Config::default()
        };
        assert_eq!(bad.validate(), Err(ConfigError::BatchSize));

        let bad = Config {
            permutations: 0,
            p_value_method: PValueMethod::Mixed,
            ..Config::default()
        };
        assert_eq!(bad.validate(), Err(ConfigError::Permutations("mixed")));

        let ok = Config {
            permutations: 0,
            p_value_method: PValueMethod::Theoretical,
            ..Config::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn serde_round_trip_skips_backend() {
        let config = Config {
            emission: Emission::Streaming { batch_size: 16 },
            trend_threshold: Some(0.5),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.emission, config.emission);
        assert_eq!(back.trend_threshold, Some(0.5));
        assert!(back.fdr_backend.is_none());
    }
}
