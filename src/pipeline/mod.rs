//! Summarization and normalization pipeline.
//!
//! A [`Pipeline`] turns a factor's replicate matrix into the masked series
//! handed to the alignment oracle:
//! - replicates collapsed per timepoint ([`Summarizer`])
//! - rank-based normalization ([`Normalizer`])
//! - optional ternary trend encoding ([`trend_encode`])

mod fill;
mod normalize;
mod rank;
mod summarize;
mod trend;

pub use fill::{fill_missing, FillMethod};
pub use normalize::{percentile_scores, robust_scale, z_score, Normalizer};
pub use rank::{rank_values, tied_rank, tied_rank_with, TieMethod};
pub use summarize::Summarizer;
pub use trend::trend_encode;

use crate::types::{MaskedSeries, ReplicateMatrix};

/// Summarize, normalize and optionally trend-encode one factor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pipeline {
    /// Replicate summarization.
    pub summarizer: Summarizer,
    /// Normalization applied after summarization.
    pub normalizer: Normalizer,
    /// Trend threshold; `None` skips trend encoding.
    pub trend_threshold: Option<f64>,
}

impl Pipeline {
    /// Run the full pipeline on one replicate matrix.
    pub fn process(&self, data: &ReplicateMatrix) -> MaskedSeries {
        let normalized = self
            .normalizer
            .normalize(&self.summarizer.summarize(data));
        match self.trend_threshold {
            Some(threshold) => trend_encode(&normalized, threshold),
            None => normalized,
        }
    }

    /// Length of the series produced for `timepoints` input timepoints.
    pub fn output_len(&self, timepoints: usize) -> usize {
        match self.trend_threshold {
            Some(_) => timepoints.saturating_sub(1),
            None => timepoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_shortens_series() {
        let data = ReplicateMatrix::from_rows(&[vec![1.0, 2.0, 3.0, 2.0, 1.0]]).unwrap();
        let pipeline = Pipeline {
            summarizer: Summarizer::Mean,
            normalizer: Normalizer::PercentileZ,
            trend_threshold: Some(0.0),
        };
        let out = pipeline.process(&data);
        assert_eq!(out.len(), 4);
        assert_eq!(pipeline.output_len(5), 4);
    }
}
