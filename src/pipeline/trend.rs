//! Ternary trend encoding of a series.

use crate::types::MaskedSeries;

/// Encode step-to-step changes as `-1`, `0` or `1`.
///
/// A length-L series yields L-1 symbols. When the current value is exactly
/// zero the symbol is the sign of the next value; otherwise the relative
/// change `(next - current) / |current|` is compared against `threshold`.
/// A missing value at either end of a step makes that symbol missing.
pub fn trend_encode(series: &MaskedSeries, threshold: f64) -> MaskedSeries {
    if series.len() < 2 {
        return MaskedSeries::invalid(0);
    }
    let (values, valid): (Vec<f64>, Vec<bool>) = (0..series.len() - 1)
        .map(|t| match (series.get(t), series.get(t + 1)) {
            (Some(current), Some(next)) => (trend_symbol(current, next, threshold), true),
            _ => (0.0, false),
        })
        .unzip();
    MaskedSeries::new(values, valid)
}

fn trend_symbol(current: f64, next: f64, threshold: f64) -> f64 {
    if current == 0.0 {
        return if next > 0.0 {
            1.0
        } else if next < 0.0 {
            -1.0
        } else {
            0.0
        };
    }
    let change = (next - current) / current.abs();
    if change >= threshold {
        1.0
    } else if change <= -threshold {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_relative_changes() {
        let s = MaskedSeries::from_values(&[1.0, 2.0, 2.1, 1.0, 0.0, -3.0, 0.0, 0.0]);
        let t = trend_encode(&s, 0.5);
        assert_eq!(t.compressed(), vec![1.0, 0.0, -1.0, -1.0, -1.0, 1.0, 0.0]);
    }

    #[test]
    fn missing_endpoint_is_missing() {
        let s = MaskedSeries::from_values(&[1.0, f64::NAN, 3.0]);
        let t = trend_encode(&s, 0.0);
        assert_eq!(t.len(), 2);
        assert_eq!(t.valid_count(), 0);
    }

    #[test]
    fn short_series_is_empty() {
        assert!(trend_encode(&MaskedSeries::from_values(&[1.0]), 0.0).is_empty());
    }
}
