//! # lsa-stats
//!
//! Significance and false-discovery control for pairwise local similarity
//! analysis (LSA) of replicated time series.
//!
//! For every pair of factors in one or two data tensors this crate
//! computes, per pair:
//! - Local-similarity alignment score, start offsets, length and delay
//! - Alignment p-value (theoretical table, permutation test, or both)
//! - Bootstrap confidence interval over replicates
//! - Plain and best-shift Pearson / Spearman correlations
//! - Storey q-values for every p-value family (buffered runs)
//!
//! ## Quick Start
//!
//! ```ignore
//! use lsa_stats::{analyze, SeriesTensor};
//!
//! let data = SeriesTensor::from_series(&[otu_a, otu_b, otu_c])?;
//! let (rows, summary) = analyze(&data)?;
//! for row in rows.iter().filter(|r| r.q_values.lsa.is_some_and(|q| q < 0.05)) {
//!     println!("{} ~ {}: LS {:.3} delay {}", row.x_label, row.y_label, row.score, row.delay);
//! }
//! ```
//!
//! ## Missing data
//!
//! Every container carries an explicit validity mask, and every statistic
//! that cannot be computed is `None`. Sinks print `None` as `nan`
//! (TSV) or `null` (JSON).

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod cancel;
mod config;
mod constants;
mod error;
mod pairwise;
mod result;
mod thread_pool;
mod types;

// Functional modules
pub mod alignment;
pub mod diagnostics;
pub mod fdr;
pub mod output;
pub mod pipeline;
pub mod statistics;

// Re-exports for public API
pub use alignment::{Alignment, AlignmentOracle, LocalSimilarity};
pub use cancel::CancelToken;
pub use config::{Config, Emission, PValueMethod, PairingMode};
pub use constants::PROMISING_P;
pub use error::{ConfigError, DataError, Error, MarkovError, SinkError};
pub use fdr::{ExternalQValue, QValueEstimator, StoreyQValue};
pub use output::{JsonLinesSink, ResultSink, TsvSink, VecSink};
pub use pairwise::{PairJob, PairwiseAnalysis};
pub use pipeline::{FillMethod, Normalizer, Pipeline, Summarizer};
pub use result::{PairStatus, QValues, ResultRow, RunSummary};
pub use statistics::BootstrapInterval;
pub use types::{MaskedSeries, Matrix3, ReplicateMatrix, SeriesTensor, Vector3};

/// Analyze every factor pair of `data` with the default configuration.
///
/// Uses the built-in [`LocalSimilarity`] oracle and buffered emission, so
/// the returned rows carry q-values.
///
/// # Errors
///
/// See [`PairwiseAnalysis::run`].
pub fn analyze(data: &SeriesTensor) -> Result<(Vec<ResultRow>, RunSummary), Error> {
    PairwiseAnalysis::new().run_collect(data, data, &LocalSimilarity)
}
