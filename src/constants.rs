//! Numeric constants shared across the significance engine.

/// Lower bound on the cosine-series truncation order for the theoretical table.
pub const KCUT_MIN: usize = 100;

/// Smallest range the theoretical table is built for.
pub const RMAX_MIN: usize = 10;

/// Largest range the theoretical table is built for (caps build time on long series).
pub const RMAX_MAX: usize = 50;

/// Default quantization of the theoretical statistic (keys are `x * 10^2`).
pub const DEFAULT_TABLE_DECIMALS: u32 = 2;

/// Largest supported quantization; beyond this the table grows past a few million keys.
pub const MAX_TABLE_DECIMALS: u32 = 4;

/// Theoretical p-values at or below this trigger a permutation re-check in mixed mode.
pub const PROMISING_P: f64 = 0.05;

/// Step of the lambda grid used for the null-proportion estimate.
pub const Q_LAMBDA_STEP: f64 = 0.05;

/// Exclusive upper end of the lambda grid.
pub const Q_LAMBDA_MAX: f64 = 0.95;

/// Resamples drawn by the bootstrap pi0 fallback.
pub const PI0_BOOTSTRAP_RESAMPLES: usize = 100;

/// Effective degrees of freedom of the pi0 smoothing spline.
pub const PI0_SMOOTH_DF: f64 = 3.0;

/// Decimal places written by the text sinks.
pub const DISPLAY_DECIMALS: i32 = 8;

/// Consistency factor turning a MAD into a normal-SD estimate.
pub const MAD_TO_SD: f64 = 1.4826;

/// Tolerance for the eigen-decomposition checks (`assert_almost_equal` at 7 decimals).
pub const EIGEN_TOLERANCE: f64 = 1.5e-7;

/// pi^2
pub const PI_SQUARED: f64 = std::f64::consts::PI * std::f64::consts::PI;
