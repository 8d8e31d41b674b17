//! Error types.
//!
//! Degenerate pairs never surface here: they become sentinel rows. These
//! errors cover invalid configuration, malformed input tensors, failed
//! Markov diagnostics, sink I/O and cancellation.

use thiserror::Error;

/// Umbrella error returned by the public entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input tensors are malformed or incompatible.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Markov diagnostics failed their eigen-decomposition checks.
    #[error(transparent)]
    Markov(#[from] MarkovError),

    /// Writing results failed.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The run was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("analysis cancelled")]
    Cancelled,
}

/// Invalid run parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Occurrence filter outside [0, 1].
    #[error("minimum occurrence must be within [0, 1], got {0}")]
    MinOccurrence(f64),

    /// Bootstrap confidence width outside (0, 1).
    #[error("bootstrap CI width must be within (0, 1), got {0}")]
    CiWidth(f64),

    /// Approximate variance must be positive and finite.
    #[error("approximate variance must be positive, got {0}")]
    ApproxVariance(f64),

    /// Trend threshold must be non-negative and finite.
    #[error("trend threshold must be non-negative, got {0}")]
    TrendThreshold(f64),

    /// Streaming batches need at least one row.
    #[error("streaming batch size must be at least 1")]
    BatchSize,

    /// Permutation-based methods need at least one permutation.
    #[error("p-value method {0} requires at least one permutation")]
    Permutations(&'static str),

    /// Table quantization too fine.
    #[error("table decimals must be at most {max}, got {found}")]
    TableDecimals {
        /// Largest supported value.
        max: u32,
        /// Requested value.
        found: u32,
    },
}

/// Malformed or incompatible input data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// A tensor dimension is zero.
    #[error("tensor has an empty dimension ({factors} x {replicates} x {timepoints})")]
    Empty {
        /// Factor count.
        factors: usize,
        /// Replicate count.
        replicates: usize,
        /// Timepoint count.
        timepoints: usize,
    },

    /// Flat buffer length does not match the declared shape.
    #[error("expected {expected} values for the declared shape, found {found}")]
    Shape {
        /// Required length.
        expected: usize,
        /// Supplied length.
        found: usize,
    },

    /// Nested input with inconsistent inner lengths.
    #[error("factor {factor}, replicate {replicate}: expected {expected} timepoints, found {found}")]
    Ragged {
        /// Factor index.
        factor: usize,
        /// Replicate index.
        replicate: usize,
        /// Required length.
        expected: usize,
        /// Supplied length.
        found: usize,
    },

    /// Nested input with inconsistent replicate counts.
    #[error("factor {factor}: expected {expected} replicates, found {found}")]
    ReplicateCount {
        /// Factor index.
        factor: usize,
        /// Required count.
        expected: usize,
        /// Supplied count.
        found: usize,
    },

    /// Label vector does not match the factor count.
    #[error("expected {expected} labels, found {found}")]
    Labels {
        /// Factor count.
        expected: usize,
        /// Supplied labels.
        found: usize,
    },

    /// Two tensors disagree on replicates or timepoints.
    #[error("tensors are not comparable: {first:?} vs {second:?} (replicates, timepoints)")]
    Incompatible {
        /// (replicates, timepoints) of the first tensor.
        first: (usize, usize),
        /// (replicates, timepoints) of the second tensor.
        second: (usize, usize),
    },

    /// On-diagonal pairing over factor sets of different size.
    #[error("on-diagonal pairing needs equal factor counts, got {first} and {second}")]
    DiagonalMismatch {
        /// Factors in the first tensor.
        first: usize,
        /// Factors in the second tensor.
        second: usize,
    },
}

/// Eigen-decomposition invariants that the trend variance depends on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkovError {
    /// Transition parameters are not a valid stochastic matrix.
    #[error("transition parameters do not form a stochastic matrix: {0:?}")]
    InvalidParameters([f64; 4]),

    /// The spectrum has complex eigenvalues.
    #[error("transition matrix has a complex spectrum")]
    ComplexSpectrum,

    /// No eigenvalue within tolerance of one.
    #[error("no unit eigenvalue found in {0:?}")]
    NoUnitEigenvalue([f64; 3]),

    /// The SVD of `M - lambda I` did not yield a finite null vector.
    #[error("no null vector found for eigenvalue {index} (SVD did not converge)")]
    NullSpace {
        /// Eigenpair index.
        index: usize,
    },

    /// A left or right eigenvector could not be normalized.
    #[error("eigenvector {index} cannot be normalized (scale {scale})")]
    Normalization {
        /// Eigenpair index.
        index: usize,
        /// Offending scale.
        scale: f64,
    },

    /// Stationary distribution does not sum to one.
    #[error("stationary eigenvector sums to {0}, expected 1")]
    Stationary(f64),

    /// Left and right eigenvectors are not bi-orthonormal.
    #[error("left/right eigenvectors not bi-orthonormal at ({row}, {col}): {value}")]
    NotBiorthonormal {
        /// Left index.
        row: usize,
        /// Right index.
        col: usize,
        /// Inner product found.
        value: f64,
    },

    /// Simulation produced no transitions from a required state.
    #[error("simulated walk never visited state {0}")]
    UnvisitedState(i8),
}

/// Result sink failures.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Underlying writer failed.
    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}
