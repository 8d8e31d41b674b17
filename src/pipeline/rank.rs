//! Tie-aware ranking of masked series.

use serde::{Deserialize, Serialize};

use crate::types::MaskedSeries;

/// How tied values share ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieMethod {
    /// Every member of a tie group gets the group's midrank.
    #[default]
    Average,
    /// Every member of a tie group gets the group's largest rank.
    Max,
}

/// 1-based ranks of `values` under `method`.
///
/// Values are compared with `total_cmp`, so callers must drop missing
/// entries first.
pub fn rank_values(values: &[f64], method: TieMethod) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end (0-based) hold ranks start+1..=end.
        let rank = match method {
            TieMethod::Average => (start + 1 + end) as f64 / 2.0,
            TieMethod::Max => end as f64,
        };
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Midranks of the valid entries; invalid entries stay invalid.
///
/// `tied_rank([1, 3, 3, 5]) == [1, 2.5, 2.5, 4]`.
pub fn tied_rank(series: &MaskedSeries) -> MaskedSeries {
    tied_rank_with(series, TieMethod::Average)
}

/// Ranks of the valid entries under an explicit tie method.
pub fn tied_rank_with(series: &MaskedSeries, method: TieMethod) -> MaskedSeries {
    let ranks = rank_values(&series.compressed(), method);
    let mut next = ranks.into_iter();
    let values = series
        .iter()
        .map(|v| match v {
            Some(_) => next.next().unwrap_or(0.0),
            None => 0.0,
        })
        .collect();
    MaskedSeries::new(values, series.validity().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midranks_for_ties() {
        let s = MaskedSeries::from_values(&[1.0, 3.0, 3.0, 5.0]);
        assert_eq!(tied_rank(&s).compressed(), vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn max_ranks_for_ties() {
        assert_eq!(
            rank_values(&[0.2, 0.1, 0.2, 0.3], TieMethod::Max),
            vec![3.0, 1.0, 3.0, 4.0]
        );
    }

    #[test]
    fn missing_entries_reinserted() {
        let s = MaskedSeries::from_values(&[5.0, f64::NAN, 1.0]);
        let r = tied_rank(&s);
        assert_eq!(r.get(0), Some(2.0));
        assert_eq!(r.get(1), None);
        assert_eq!(r.get(2), Some(1.0));
    }
}
