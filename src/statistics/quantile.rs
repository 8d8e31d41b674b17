//! Quantiles and robust scale estimates using O(n) selection.
//!
//! Quantiles use `slice.select_nth_unstable_by()` (introselect, O(n)
//! average) with the R-7 definition (linear interpolation between order
//! statistics).

use crate::constants::MAD_TO_SD;

/// Compute a single quantile from a mutable slice.
///
/// The slice is partially reordered as a side effect.
///
/// # Arguments
///
/// * `data` - Mutable slice of values (will be partially reordered)
/// * `p` - Quantile probability in [0, 1]
///
/// # Panics
///
/// Panics if `data` is empty or if `p` is outside [0, 1].
pub fn compute_quantile(data: &mut [f64], p: f64) -> f64 {
    assert!(!data.is_empty(), "Cannot compute quantile of empty slice");
    assert!(
        (0.0..=1.0).contains(&p),
        "Quantile probability must be in [0, 1]"
    );

    let n = data.len();
    if n == 1 {
        return data[0];
    }

    let h = (n - 1) as f64 * p;
    let h_floor = h.floor() as usize;
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        let (_, &mut max, _) = data.select_nth_unstable_by(n - 1, |a, b| a.total_cmp(b));
        return max;
    }

    let (_, &mut lower, upper) = data.select_nth_unstable_by(h_floor, |a, b| a.total_cmp(b));

    if h_frac == 0.0 {
        return lower;
    }

    let upper_min = upper
        .iter()
        .copied()
        .min_by(|a, b| a.total_cmp(b))
        .unwrap_or(lower);

    lower + h_frac * (upper_min - lower)
}

/// Median of `data`, `None` when empty.
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut working = data.to_vec();
    Some(compute_quantile(&mut working, 0.5))
}

/// Raw median absolute deviation `median(|x - median(x)|)`.
pub fn mad(data: &[f64]) -> Option<f64> {
    let center = median(data)?;
    let deviations: Vec<f64> = data.iter().map(|x| (x - center).abs()).collect();
    median(&deviations)
}

/// MAD scaled to estimate a normal standard deviation.
pub fn mad_sd(data: &[f64]) -> Option<f64> {
    mad(data).map(|m| m * MAD_TO_SD)
}

/// Interquartile range (R-7 quartiles).
pub fn iqr(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut working = data.to_vec();
    let q3 = compute_quantile(&mut working, 0.75);
    let q1 = compute_quantile(&mut working, 0.25);
    Some(q3 - q1)
}

/// Arithmetic mean, `None` when empty.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

/// Standard deviation with `ddof` delta degrees of freedom.
///
/// `None` when fewer than `ddof + 1` values are available.
pub fn std_dev(data: &[f64], ddof: usize) -> Option<f64> {
    if data.len() <= ddof {
        return None;
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (data.len() - ddof) as f64).sqrt())
}
