//! False-discovery control over vectors of p-values.
//!
//! Estimators take `&[Option<f64>]` and return a vector of the same length;
//! undefined inputs stay undefined at the same position and never enter
//! the fit.

mod storey;

pub use storey::{lambda_grid, Pi0Estimate, Pi0Method, StoreyQValue};

use std::fmt;
use std::sync::Arc;

/// Converts p-values into q-values.
pub trait QValueEstimator: Send + Sync + fmt::Debug {
    /// q-values aligned with `p_values`.
    fn q_values(&self, p_values: &[Option<f64>]) -> Vec<Option<f64>>;
}

type QValueFn = dyn Fn(&[Option<f64>]) -> Vec<Option<f64>> + Send + Sync;

/// Adapter turning any closure with the estimator contract into a backend.
#[derive(Clone)]
pub struct ExternalQValue {
    name: String,
    func: Arc<QValueFn>,
}

impl ExternalQValue {
    /// Wrap `func` under a display `name`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Option<f64>]) -> Vec<Option<f64>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Display name of the backend.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ExternalQValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalQValue")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl QValueEstimator for ExternalQValue {
    fn q_values(&self, p_values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut out = (self.func)(p_values);
        // Hold the backend to the positional contract.
        out.resize(p_values.len(), None);
        for (q, p) in out.iter_mut().zip(p_values) {
            if p.is_none() {
                *q = None;
            }
        }
        out
    }
}
