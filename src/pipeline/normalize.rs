//! Rank-based normalization of summarized series.
//!
//! Every normalizer keeps the validity mask of its input; invalid slots
//! carry zero.

use serde::{Deserialize, Serialize};

use super::rank::tied_rank;
use crate::constants::MAD_TO_SD;
use crate::statistics::{iqr, mad, median, normal_quantile, std_dev};
use crate::types::MaskedSeries;

/// Normalization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Normalizer {
    /// Normal scores `Phi^-1(rank / (n_valid + 1))`, uncentered.
    Percentile,
    /// Normal scores, then z-scored.
    PercentileZ,
    /// Normal scores centered on the median and scaled by a robust spread.
    Robust,
    /// Zeros treated as missing, then normal scores z-scored.
    #[default]
    NoZero,
    /// Pass-through.
    None,
}

impl Normalizer {
    /// Normalize a summarized series.
    pub fn normalize(self, series: &MaskedSeries) -> MaskedSeries {
        match self {
            Self::Percentile => percentile_scores(series),
            Self::PercentileZ => z_score(&percentile_scores(series)),
            Self::Robust => robust_scale(&percentile_scores(series)),
            Self::NoZero => z_score(&percentile_scores(&series.mask_where(|x| x == 0.0))),
            Self::None => series.clone(),
        }
    }
}

/// Standard-normal quantiles of the tied ranks over `n_valid + 1`.
pub fn percentile_scores(series: &MaskedSeries) -> MaskedSeries {
    let n = series.valid_count() as f64;
    tied_rank(series).map(|rank| normal_quantile(rank / (n + 1.0)))
}

/// Center on the mean and scale by the population SD (center only when SD is zero).
pub fn z_score(series: &MaskedSeries) -> MaskedSeries {
    let valid = series.compressed();
    let Some(sd) = std_dev(&valid, 0) else {
        return series.clone();
    };
    let center = valid.iter().sum::<f64>() / valid.len() as f64;
    if sd > 0.0 {
        series.map(|x| (x - center) / sd)
    } else {
        series.map(|x| x - center)
    }
}

/// Center on the median; scale by `1.4826 * MAD`, else `IQR / 4`, else `range / 4`.
pub fn robust_scale(series: &MaskedSeries) -> MaskedSeries {
    let valid = series.compressed();
    let Some(center) = median(&valid) else {
        return series.clone();
    };
    let range = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        - valid.iter().copied().fold(f64::INFINITY, f64::min);
    let scale = [
        mad(&valid).map(|m| m * MAD_TO_SD),
        iqr(&valid).map(|q| q / 4.0),
        Some(range / 4.0),
    ]
    .into_iter()
    .flatten()
    .find(|s| *s > 0.0 && s.is_finite());
    match scale {
        Some(s) => series.map(|x| (x - center) / s),
        None => series.map(|x| x - center),
    }
}
