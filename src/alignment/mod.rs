//! Local alignment scoring behind a pluggable oracle.
//!
//! The significance machinery only needs a score and an alignment trace
//! for two equal-length normalized series, so the scoring routine is a
//! trait. [`LocalSimilarity`] is the built-in implementation.

mod local_similarity;

pub use local_similarity::LocalSimilarity;

use serde::{Deserialize, Serialize};

/// Best local alignment of two series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Alignment {
    /// Signed, length-normalized score; negative for anti-associated runs.
    pub score: f64,
    /// Aligned index pairs (1-based), ordered from the end cell back to the
    /// start cell. Empty when nothing aligned or when no trace was requested.
    pub trace: Vec<(usize, usize)>,
}

impl Alignment {
    /// An alignment that matched nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of aligned cells.
    pub fn len(&self) -> usize {
        self.trace.len()
    }

    /// True when nothing aligned.
    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    /// 1-based start offsets `(x_start, y_start)` of the aligned run.
    pub fn start(&self) -> Option<(usize, usize)> {
        self.trace.last().copied()
    }
}

/// Scores the best local alignment of two series within a delay band.
///
/// Implementations must be deterministic, must accept empty or constant
/// input, and must be shareable across worker threads.
pub trait AlignmentOracle: Send + Sync {
    /// Align `x` against `y` allowing shifts of at most `delay_limit`.
    ///
    /// `x` and `y` have equal length. When `keep_trace` is false the trace
    /// may be left empty.
    fn align(&self, x: &[f64], y: &[f64], delay_limit: usize, keep_trace: bool) -> Alignment;

    /// Convenience: score only.
    fn score(&self, x: &[f64], y: &[f64], delay_limit: usize) -> f64 {
        self.align(x, y, delay_limit, false).score
    }
}

impl<T: AlignmentOracle + ?Sized> AlignmentOracle for &T {
    fn align(&self, x: &[f64], y: &[f64], delay_limit: usize, keep_trace: bool) -> Alignment {
        (**self).align(x, y, delay_limit, keep_trace)
    }
}

impl<T: AlignmentOracle + ?Sized> AlignmentOracle for Box<T> {
    fn align(&self, x: &[f64], y: &[f64], delay_limit: usize, keep_trace: bool) -> Alignment {
        (**self).align(x, y, delay_limit, keep_trace)
    }
}

impl<T: AlignmentOracle + ?Sized> AlignmentOracle for std::sync::Arc<T> {
    fn align(&self, x: &[f64], y: &[f64], delay_limit: usize, keep_trace: bool) -> Alignment {
        (**self).align(x, y, delay_limit, keep_trace)
    }
}
