//! Banded local-similarity dynamic program.
//!
//! For every cell `(i, j)` with `|i - j| <= D` two running sums are kept
//! along the diagonal:
//!
//! ```text
//! P(i, j) = max(0, P(i-1, j-1) + x_i * y_j)
//! N(i, j) = max(0, N(i-1, j-1) - x_i * y_j)
//! ```
//!
//! The score is `max(P, N) / n`, negated when the best run is in `N`.
//! Since every cell only depends on its diagonal predecessor, one slot per
//! diagonal is enough and memory is O(D).

use super::{Alignment, AlignmentOracle};

/// The classic local-similarity score with a delay band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalSimilarity;

#[derive(Debug, Clone, Copy, Default)]
struct Run {
    sum: f64,
    start: usize,
}

impl Run {
    fn extend(&mut self, step: f64, i: usize) {
        if self.sum <= 0.0 {
            self.start = i;
            self.sum = 0.0;
        }
        self.sum = (self.sum + step).max(0.0);
    }
}

#[derive(Debug, Clone, Copy)]
struct Best {
    value: f64,
    negative: bool,
    end_i: usize,
    start_i: usize,
    offset: isize,
}

impl AlignmentOracle for LocalSimilarity {
    fn align(&self, x: &[f64], y: &[f64], delay_limit: usize, keep_trace: bool) -> Alignment {
        let n = x.len().min(y.len());
        if n == 0 {
            return Alignment::empty();
        }
        let band = delay_limit.min(n - 1) as isize;
        let width = (2 * band + 1) as usize;
        let mut positive = vec![Run::default(); width];
        let mut negative = vec![Run::default(); width];
        let mut best: Option<Best> = None;

        for i in 0..n {
            for slot in 0..width {
                // j = i + offset
                let offset = slot as isize - band;
                let j = i as isize + offset;
                if j < 0 || j >= n as isize {
                    continue;
                }
                let product = x[i] * y[j as usize];
                if !product.is_finite() {
                    positive[slot] = Run::default();
                    negative[slot] = Run::default();
                    continue;
                }
                positive[slot].extend(product, i);
                negative[slot].extend(-product, i);

                let current = best.map_or(0.0, |b| b.value);
                if positive[slot].sum > current {
                    best = Some(Best {
                        value: positive[slot].sum,
                        negative: false,
                        end_i: i,
                        start_i: positive[slot].start,
                        offset,
                    });
                }
                let current = best.map_or(0.0, |b| b.value);
                if negative[slot].sum > current {
                    best = Some(Best {
                        value: negative[slot].sum,
                        negative: true,
                        end_i: i,
                        start_i: negative[slot].start,
                        offset,
                    });
                }
            }
        }

        let Some(best) = best else {
            return Alignment::empty();
        };
        let magnitude = best.value / n as f64;
        let score = if best.negative { -magnitude } else { magnitude };
        let trace = if keep_trace {
            (best.start_i..=best.end_i)
                .rev()
                .map(|i| (i + 1, (i as isize + best.offset) as usize + 1))
                .collect()
        } else {
            Vec::new()
        };
        Alignment { score, trace }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_series_align_fully() {
        let x = [1.0, -1.0, 1.0, -1.0];
        let a = LocalSimilarity.align(&x, &x, 0, true);
        assert!((a.score - 1.0).abs() < 1e-12);
        assert_eq!(a.len(), 4);
        assert_eq!(a.start(), Some((1, 1)));
        assert_eq!(a.trace.first(), Some(&(4, 4)));
    }

    #[test]
    fn anti_correlated_is_negative() {
        let x = [1.0, -1.0, 2.0, -2.0];
        let y = [-1.0, 1.0, -2.0, 2.0];
        let a = LocalSimilarity.align(&x, &y, 1, true);
        assert!((a.score + 10.0 / 4.0).abs() < 1e-12);
        assert_eq!(a.start(), Some((1, 1)));
    }

    #[test]
    fn delay_is_found() {
        // y lags x by one step
        let x = [1.0, 2.0, -1.0, 3.0, 0.0];
        let y = [0.0, 1.0, 2.0, -1.0, 3.0];
        let a = LocalSimilarity.align(&x, &y, 2, true);
        let (xs, ys) = a.start().unwrap();
        assert_eq!(ys as isize - xs as isize, 1);
        assert!((a.score - 15.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn constant_and_empty_input() {
        assert!(LocalSimilarity.align(&[], &[], 3, true).is_empty());
        let zeros = [0.0; 5];
        let a = LocalSimilarity.align(&zeros, &zeros, 2, true);
        assert_eq!(a.score, 0.0);
        assert!(a.is_empty());
    }

    #[test]
    fn trace_skipped_on_request() {
        let x = [1.0, 2.0, 3.0];
        let a = LocalSimilarity.align(&x, &x, 1, false);
        assert!(a.trace.is_empty());
        assert!((a.score - 14.0 / 3.0).abs() < 1e-12);
    }
}
