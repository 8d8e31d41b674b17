//! Collapsing replicates into one value per timepoint.

use serde::{Deserialize, Serialize};

use crate::statistics::{mad, mean, median, std_dev};
use crate::types::{MaskedSeries, ReplicateMatrix};

/// Replicate summarization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Summarizer {
    /// Mean of valid replicates.
    #[default]
    Mean,
    /// Mean scaled by inverse variance; falls back to `Mean` when any
    /// timepoint's sample SD is zero or undefined.
    SdWeightedMean,
    /// Median of valid replicates.
    Median,
    /// Median scaled by inverse squared MAD; falls back to `Median` when any
    /// timepoint's MAD is zero or undefined.
    MadWeightedMedian,
}

impl Summarizer {
    /// Summarize `data` into one masked value per timepoint.
    ///
    /// Timepoints without any valid replicate are invalid.
    pub fn summarize(self, data: &ReplicateMatrix) -> MaskedSeries {
        let columns: Vec<Vec<f64>> = (0..data.timepoints())
            .map(|t| data.column_values(t))
            .collect();
        match self {
            Self::Mean => per_column(&columns, mean),
            Self::Median => per_column(&columns, median),
            Self::SdWeightedMean => {
                weighted(&columns, mean, |c| std_dev(c, 1)).unwrap_or_else(|| per_column(&columns, mean))
            }
            Self::MadWeightedMedian => {
                weighted(&columns, median, mad).unwrap_or_else(|| per_column(&columns, median))
            }
        }
    }
}

fn per_column(columns: &[Vec<f64>], center: fn(&[f64]) -> Option<f64>) -> MaskedSeries {
    MaskedSeries::from_options(&columns.iter().map(|c| center(c)).collect::<Vec<_>>())
}

/// `center_t / scale_t^2 / sum_t(1 / scale_t)`, or `None` if any timepoint
/// has a zero or undefined scale. A timepoint with no valid replicate has an
/// undefined scale.
fn weighted(
    columns: &[Vec<f64>],
    center: fn(&[f64]) -> Option<f64>,
    scale: impl Fn(&[f64]) -> Option<f64>,
) -> Option<MaskedSeries> {
    let mut pairs = Vec::with_capacity(columns.len());
    for column in columns {
        let s = scale(column).filter(|s| *s > 0.0 && s.is_finite())?;
        pairs.push((center(column)?, s));
    }
    let inverse_sum: f64 = pairs.iter().map(|(_, s)| 1.0 / s).sum();
    if inverse_sum == 0.0 {
        return None;
    }
    let values: Vec<Option<f64>> = pairs
        .iter()
        .map(|&(c, s)| Some(c / (s * s) / inverse_sum))
        .collect();
    Some(MaskedSeries::from_options(&values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[Vec<f64>]) -> ReplicateMatrix {
        ReplicateMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn mean_and_median() {
        let m = matrix(&[vec![1.0, 10.0], vec![2.0, f64::NAN], vec![6.0, 20.0]]);
        assert_eq!(Summarizer::Mean.summarize(&m).compressed(), vec![3.0, 15.0]);
        assert_eq!(Summarizer::Median.summarize(&m).compressed(), vec![2.0, 15.0]);
    }

    #[test]
    fn sd_weighted_falls_back_with_one_replicate() {
        let m = matrix(&[vec![1.0, 2.0, 3.0]]);
        assert_eq!(
            Summarizer::SdWeightedMean.summarize(&m),
            Summarizer::Mean.summarize(&m)
        );
    }

    #[test]
    fn sd_weighted_formula() {
        // column 0: mean 2, sd 1; column 1: mean 4, sd 2
        let m = matrix(&[vec![1.0, 2.0], vec![3.0, 6.0]]);
        let sd0 = std_dev(&[1.0, 3.0], 1).unwrap();
        let sd1 = std_dev(&[2.0, 6.0], 1).unwrap();
        let inv = 1.0 / sd0 + 1.0 / sd1;
        let s = Summarizer::SdWeightedMean.summarize(&m);
        assert!((s.get(0).unwrap() - 2.0 / (sd0 * sd0) / inv).abs() < 1e-12);
        assert!((s.get(1).unwrap() - 4.0 / (sd1 * sd1) / inv).abs() < 1e-12);
    }

    #[test]
    fn empty_timepoint_is_invalid() {
        let m = matrix(&[vec![1.0, f64::NAN], vec![2.0, f64::NAN]]);
        for summarizer in [
            Summarizer::Mean,
            Summarizer::Median,
            Summarizer::SdWeightedMean,
            Summarizer::MadWeightedMedian,
        ] {
            let s = summarizer.summarize(&m);
            assert_eq!(s.get(0), Some(1.5), "{summarizer:?}");
            assert_eq!(s.get(1), None, "{summarizer:?}");
        }
    }

    #[test]
    fn weighted_fall_back_when_a_timepoint_is_missing() {
        let m = matrix(&[vec![1.0, 2.0, f64::NAN], vec![3.0, 6.0, f64::NAN]]);
        let mean = Summarizer::Mean.summarize(&m);
        let median = Summarizer::Median.summarize(&m);
        assert_eq!(mean.compressed(), vec![2.0, 4.0]);
        assert_eq!(Summarizer::SdWeightedMean.summarize(&m), mean);
        assert_eq!(Summarizer::MadWeightedMedian.summarize(&m), median);
    }
}
