//! Result records of a pairwise analysis.

use serde::{Deserialize, Serialize};

use crate::config::Emission;
use crate::statistics::{Correlation, ShiftedCorrelation};

/// How a row was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PairStatus {
    /// Full analysis ran.
    Analyzed,
    /// A factor was entirely missing or failed the occurrence filter.
    NoData,
    /// The alignment matched nothing; correlations are still reported.
    EmptyAlignment,
    /// Processing this pair failed; the scan continued.
    Failed,
}

impl PairStatus {
    /// Start offset reported for sentinel rows.
    pub fn sentinel_start(self) -> Option<i64> {
        match self {
            Self::NoData | Self::Failed => Some(-2),
            Self::EmptyAlignment => Some(-1),
            Self::Analyzed => None,
        }
    }
}

/// q-values of the five p-value families.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct QValues {
    /// Local-similarity p-value family.
    pub lsa: Option<f64>,
    /// Pearson family.
    pub pearson: Option<f64>,
    /// Shifted Pearson family.
    pub shifted_pearson: Option<f64>,
    /// Spearman family.
    pub spearman: Option<f64>,
    /// Shifted Spearman family.
    pub shifted_spearman: Option<f64>,
}

/// One analyzed (or sentinel) factor pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRow {
    /// 0-based index into the first tensor.
    pub i: usize,
    /// 0-based index into the second tensor.
    pub j: usize,
    /// Label of factor `i`.
    pub x_label: String,
    /// Label of factor `j`.
    pub y_label: String,
    /// Alignment score (bootstrap mean when resampling ran).
    pub score: f64,
    /// Lower confidence bound.
    pub ci_low: f64,
    /// Upper confidence bound.
    pub ci_high: f64,
    /// 1-based start in the first series; -1 / -2 on sentinel rows.
    pub x_start: i64,
    /// 1-based start in the second series; -1 / -2 on sentinel rows.
    pub y_start: i64,
    /// Aligned length.
    pub align_len: usize,
    /// `x_start - y_start`.
    pub delay: i64,
    /// Alignment p-value; `None` when undefined.
    pub p_value: Option<f64>,
    /// Plain Pearson correlation.
    pub pearson: Option<Correlation>,
    /// Best-shift Pearson correlation.
    pub shifted_pearson: Option<ShiftedCorrelation>,
    /// Plain Spearman correlation.
    pub spearman: Option<Correlation>,
    /// Best-shift Spearman correlation.
    pub shifted_spearman: Option<ShiftedCorrelation>,
    /// q-values; all `None` in streaming mode.
    pub q_values: QValues,
    /// How the row was produced.
    pub status: PairStatus,
}

impl ResultRow {
    /// A sentinel row: zero score, `p = 1`, no correlations.
    pub fn sentinel(i: usize, j: usize, x_label: &str, y_label: &str, status: PairStatus) -> Self {
        let start = status.sentinel_start().unwrap_or(-2);
        Self {
            i,
            j,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            score: 0.0,
            ci_low: 0.0,
            ci_high: 0.0,
            x_start: start,
            y_start: start,
            align_len: 0,
            delay: 0,
            p_value: Some(1.0),
            pearson: None,
            shifted_pearson: None,
            spearman: None,
            shifted_spearman: None,
            q_values: QValues::default(),
            status,
        }
    }

    /// p-value entering the LSA FDR family; sentinels are excluded.
    pub fn lsa_p_for_fdr(&self) -> Option<f64> {
        match self.status {
            PairStatus::Analyzed => self.p_value,
            _ => None,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Pairs visited.
    pub pairs: usize,
    /// Rows with a full analysis.
    pub analyzed: usize,
    /// No-data sentinel rows.
    pub no_data: usize,
    /// Empty-alignment sentinel rows.
    pub empty_alignment: usize,
    /// Failed rows.
    pub failed: usize,
    /// Emission mode that was in effect.
    pub emission: Emission,
    /// Whether q-values were computed (false in streaming mode).
    pub q_values_computed: bool,
    /// Wall-clock runtime in seconds.
    pub runtime_secs: f64,
}

impl RunSummary {
    /// Empty summary for `emission`.
    pub fn new(emission: Emission) -> Self {
        Self {
            pairs: 0,
            analyzed: 0,
            no_data: 0,
            empty_alignment: 0,
            failed: 0,
            emission,
            q_values_computed: emission.computes_q_values(),
            runtime_secs: 0.0,
        }
    }

    /// Count one emitted row.
    pub fn record(&mut self, row: &ResultRow) {
        self.pairs += 1;
        match row.status {
            PairStatus::Analyzed => self.analyzed += 1,
            PairStatus::NoData => self.no_data += 1,
            PairStatus::EmptyAlignment => self.empty_alignment += 1,
            PairStatus::Failed => self.failed += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_rows() {
        let row = ResultRow::sentinel(0, 1, "a", "b", PairStatus::NoData);
        assert_eq!((row.x_start, row.y_start), (-2, -2));
        assert_eq!(row.p_value, Some(1.0));
        assert_eq!(row.lsa_p_for_fdr(), None);
        let row = ResultRow::sentinel(0, 1, "a", "b", PairStatus::EmptyAlignment);
        assert_eq!((row.x_start, row.y_start), (-1, -1));
    }

    #[test]
    fn summary_counts_statuses() {
        let mut summary = RunSummary::new(Emission::Streaming { batch_size: 2 });
        assert!(!summary.q_values_computed);
        summary.record(&ResultRow::sentinel(0, 1, "a", "b", PairStatus::Failed));
        summary.record(&ResultRow::sentinel(0, 2, "a", "c", PairStatus::NoData));
        assert_eq!(summary.pairs, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.no_data, 1);
    }
}
