//! Interpolation of interior gaps in a single replicate series.
//!
//! Only gaps with a valid neighbour on both sides are filled; leading and
//! trailing gaps stay missing because every method here interpolates and
//! never extrapolates.

use serde::{Deserialize, Serialize};

use crate::types::MaskedSeries;

/// Gap-filling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillMethod {
    /// Leave gaps missing.
    #[default]
    None,
    /// Carry the previous valid value forward (step interpolation).
    Zero,
    /// Straight line between the surrounding valid values.
    Linear,
    /// Closest valid neighbour; ties go to the earlier one.
    Nearest,
}

/// Fill interior gaps of `series` with `method`.
pub fn fill_missing(series: &MaskedSeries, method: FillMethod) -> MaskedSeries {
    let interpolate: fn(usize, f64, usize, f64, usize) -> f64 = match method {
        FillMethod::None => return series.clone(),
        FillMethod::Zero => |_, lo_v, _, _, _| lo_v,
        FillMethod::Linear => |lo, lo_v, hi, hi_v, i| {
            let frac = (i - lo) as f64 / (hi - lo) as f64;
            lo_v + frac * (hi_v - lo_v)
        },
        FillMethod::Nearest => |lo, lo_v, hi, hi_v, i| {
            if i - lo <= hi - i {
                lo_v
            } else {
                hi_v
            }
        },
    };
    let known: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();
    if known.len() < 2 {
        return series.clone();
    }

    let mut values = series.values().to_vec();
    let mut valid = series.validity().to_vec();
    for pair in known.windows(2) {
        let (lo, lo_v) = pair[0];
        let (hi, hi_v) = pair[1];
        for i in lo + 1..hi {
            values[i] = interpolate(lo, lo_v, hi, hi_v, i);
            valid[i] = true;
        }
    }
    MaskedSeries::new(values, valid)
}
