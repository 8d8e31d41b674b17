//! Thin wrappers over `statrs` distributions that never panic.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

fn standard_normal() -> Option<Normal> {
    Normal::new(0.0, 1.0).ok()
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    standard_normal().map_or(f64::NAN, |n| n.cdf(x))
}

/// Standard normal quantile; `NaN` outside (0, 1), infinite at the ends.
pub fn normal_quantile(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    standard_normal().map_or(f64::NAN, |n| n.inverse_cdf(p))
}

/// Two-tailed p-value of a t statistic with `df` degrees of freedom.
pub fn students_t_two_tailed(t: f64, df: f64) -> Option<f64> {
    if !t.is_finite() {
        return t.is_infinite().then_some(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_round_trip() {
        assert!((normal_quantile(0.5)).abs() < 1e-9);
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-5);
        assert!((normal_cdf(1.959964) - 0.975).abs() < 1e-5);
        assert!(normal_quantile(1.5).is_nan());
    }

    #[test]
    fn t_two_tailed() {
        // t = 2.228 at df = 10 is the 0.05 two-tailed critical value
        let p = students_t_two_tailed(2.228, 10.0).unwrap();
        assert!((p - 0.05).abs() < 1e-3);
        assert_eq!(students_t_two_tailed(f64::INFINITY, 5.0), Some(0.0));
        assert_eq!(students_t_two_tailed(1.0, 0.0), None);
    }
}
