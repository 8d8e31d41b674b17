//! Type aliases and the masked containers every stage works on.
//!
//! Missing data is never encoded implicitly: each container pairs a value
//! buffer with a validity buffer, and every operation defined here
//! propagates invalidity (any invalid operand gives an invalid result).
//! Invalid slots always hold `0.0` so containers compare and hash stably.

use nalgebra::{Matrix3 as NMatrix3, Vector3 as NVector3};

use crate::error::DataError;

/// 3x3 transition matrix of the trend Markov chain.
pub type Matrix3 = NMatrix3<f64>;

/// 3-vector (eigenvalues, eigenvectors) of the trend Markov chain.
pub type Vector3 = NVector3<f64>;

/// A 1-D series with an explicit validity mask.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaskedSeries {
    values: Vec<f64>,
    valid: Vec<bool>,
}

impl MaskedSeries {
    /// Build from parallel value and validity buffers.
    ///
    /// Non-finite values are marked invalid.
    ///
    /// # Panics
    ///
    /// Panics if the buffers differ in length.
    pub fn new(values: Vec<f64>, valid: Vec<bool>) -> Self {
        assert_eq!(
            values.len(),
            valid.len(),
            "values and validity must have the same length"
        );
        let mut series = Self { values, valid };
        series.canonicalize();
        series
    }

    /// Build from raw values, treating `NaN` and infinities as missing.
    pub fn from_values(values: &[f64]) -> Self {
        let valid = values.iter().map(|v| v.is_finite()).collect();
        Self::new(values.to_vec(), valid)
    }

    /// Build from optional values.
    pub fn from_options(values: &[Option<f64>]) -> Self {
        let valid = values.iter().map(|v| v.is_some()).collect();
        let values = values.iter().map(|v| v.unwrap_or(0.0)).collect();
        Self::new(values, valid)
    }

    /// A series of `len` invalid entries.
    pub fn invalid(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
            valid: vec![false; len],
        }
    }

    fn canonicalize(&mut self) {
        for (v, ok) in self.values.iter_mut().zip(self.valid.iter_mut()) {
            if !v.is_finite() {
                *ok = false;
            }
            if !*ok {
                *v = 0.0;
            }
        }
    }

    /// Number of entries, valid or not.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `i`, `None` if invalid or out of range.
    pub fn get(&self, i: usize) -> Option<f64> {
        match self.valid.get(i) {
            Some(true) => Some(self.values[i]),
            _ => None,
        }
    }

    /// Whether entry `i` is valid.
    pub fn is_valid(&self, i: usize) -> bool {
        self.valid.get(i).copied().unwrap_or(false)
    }

    /// Raw value buffer (invalid slots hold zero).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Validity buffer.
    pub fn validity(&self) -> &[bool] {
        &self.valid
    }

    /// Count of valid entries.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&ok| ok).count()
    }

    /// True when no entry is valid.
    pub fn all_invalid(&self) -> bool {
        !self.valid.iter().any(|&ok| ok)
    }

    /// Valid values in order, invalid entries dropped.
    pub fn compressed(&self) -> Vec<f64> {
        self.iter().flatten().collect()
    }

    /// Values with invalid entries replaced by `fill`.
    pub fn filled(&self, fill: f64) -> Vec<f64> {
        self.iter().map(|v| v.unwrap_or(fill)).collect()
    }

    /// Iterate entries as options.
    pub fn iter(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.values
            .iter()
            .zip(self.valid.iter())
            .map(|(&v, &ok)| ok.then_some(v))
    }

    /// Apply `f` to every valid entry; non-finite outputs become invalid.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        let values = self
            .iter()
            .map(|v| v.map(&f).unwrap_or(0.0))
            .collect();
        Self::new(values, self.valid.clone())
    }

    /// Invalidate every valid entry matching `pred`.
    pub fn mask_where<F: Fn(f64) -> bool>(&self, pred: F) -> Self {
        let valid = self
            .iter()
            .map(|v| v.is_some_and(|x| !pred(x)))
            .collect();
        Self::new(self.values.clone(), valid)
    }

    /// Contiguous sub-series `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            values: self.values[start..end].to_vec(),
            valid: self.valid[start..end].to_vec(),
        }
    }

    /// Pairwise-complete observations of two series of equal length.
    pub fn paired_complete(&self, other: &Self) -> (Vec<f64>, Vec<f64>) {
        self.iter()
            .zip(other.iter())
            .filter_map(|(a, b)| Some((a?, b?)))
            .unzip()
    }
}

/// Replicate measurements of one factor: `[replicate][timepoint]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateMatrix {
    replicates: usize,
    timepoints: usize,
    values: Vec<f64>,
    valid: Vec<bool>,
}

impl ReplicateMatrix {
    /// Build from row-major replicate data; non-finite values are missing.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != replicates * timepoints`.
    pub fn new(replicates: usize, timepoints: usize, values: Vec<f64>) -> Self {
        assert_eq!(
            values.len(),
            replicates * timepoints,
            "replicate matrix buffer does not match its shape"
        );
        let valid: Vec<bool> = values.iter().map(|v| v.is_finite()).collect();
        let values = values
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect();
        Self {
            replicates,
            timepoints,
            values,
            valid,
        }
    }

    /// Build from replicate rows; rows must share a length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, DataError> {
        let timepoints = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * timepoints);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != timepoints {
                return Err(DataError::Ragged {
                    factor: 0,
                    replicate: r,
                    expected: timepoints,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self::new(rows.len(), timepoints, values))
    }

    /// Replicate count.
    pub fn replicates(&self) -> usize {
        self.replicates
    }

    /// Timepoint count.
    pub fn timepoints(&self) -> usize {
        self.timepoints
    }

    /// Entry at replicate `r`, timepoint `t`.
    pub fn get(&self, r: usize, t: usize) -> Option<f64> {
        let idx = r * self.timepoints + t;
        self.valid[idx].then(|| self.values[idx])
    }

    /// Replicate row `r` as a masked series.
    pub fn row(&self, r: usize) -> MaskedSeries {
        let start = r * self.timepoints;
        let end = start + self.timepoints;
        MaskedSeries::new(
            self.values[start..end].to_vec(),
            self.valid[start..end].to_vec(),
        )
    }

    /// Valid replicate values at timepoint `t`.
    pub fn column_values(&self, t: usize) -> Vec<f64> {
        (0..self.replicates).filter_map(|r| self.get(r, t)).collect()
    }

    /// True when no entry is valid.
    pub fn all_invalid(&self) -> bool {
        !self.valid.iter().any(|&ok| ok)
    }

    /// Per-timepoint mean over valid replicates.
    pub fn replicate_mean(&self) -> MaskedSeries {
        let (values, valid): (Vec<f64>, Vec<bool>) = (0..self.timepoints)
            .map(|t| {
                let column = self.column_values(t);
                if column.is_empty() {
                    (0.0, false)
                } else {
                    (column.iter().sum::<f64>() / column.len() as f64, true)
                }
            })
            .unzip();
        MaskedSeries::new(values, valid)
    }

    /// Fraction of timepoints whose replicate mean is valid and non-zero.
    pub fn occurrence(&self) -> f64 {
        if self.timepoints == 0 {
            return 0.0;
        }
        let present = self
            .replicate_mean()
            .iter()
            .filter(|v| v.is_some_and(|x| x != 0.0))
            .count();
        present as f64 / self.timepoints as f64
    }

    /// Reorder timepoints: column `t` of the result is column `order[t]` of `self`.
    ///
    /// All replicates move together.
    pub fn permute_timepoints_into(&self, order: &[usize], out: &mut ReplicateMatrix) {
        assert_eq!(order.len(), self.timepoints, "order must cover every timepoint");
        assert_eq!(out.values.len(), self.values.len(), "output shape mismatch");
        for r in 0..self.replicates {
            let base = r * self.timepoints;
            for (t, &src) in order.iter().enumerate() {
                out.values[base + t] = self.values[base + src];
                out.valid[base + t] = self.valid[base + src];
            }
        }
    }

    /// Overwrite entry `(r, t)` of `self` with entry `(src_r, t)` of `source`.
    pub(crate) fn copy_entry_from(&mut self, r: usize, t: usize, source: &Self, src_r: usize) {
        let dst = r * self.timepoints + t;
        let src = src_r * source.timepoints + t;
        self.values[dst] = source.values[src];
        self.valid[dst] = source.valid[src];
    }

    /// Apply a per-row transform (used by missing-value filling).
    pub(crate) fn map_rows<F: Fn(&MaskedSeries) -> MaskedSeries>(&self, f: F) -> Self {
        let mut out = self.clone();
        for r in 0..self.replicates {
            let row = f(&self.row(r));
            let base = r * self.timepoints;
            for t in 0..self.timepoints {
                out.values[base + t] = row.values()[t];
                out.valid[base + t] = row.validity()[t];
            }
        }
        out
    }
}

/// `[factor][replicate][timepoint]` measurements with factor labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTensor {
    factors: Vec<ReplicateMatrix>,
    labels: Vec<String>,
    replicates: usize,
    timepoints: usize,
}

impl SeriesTensor {
    /// Build from a flat row-major buffer of shape `factors x replicates x timepoints`.
    ///
    /// `NaN` marks a missing measurement. Labels default to `"1".."n"`.
    pub fn new(
        factors: usize,
        replicates: usize,
        timepoints: usize,
        data: Vec<f64>,
    ) -> Result<Self, DataError> {
        if factors == 0 || replicates == 0 || timepoints == 0 {
            return Err(DataError::Empty {
                factors,
                replicates,
                timepoints,
            });
        }
        let expected = factors * replicates * timepoints;
        if data.len() != expected {
            return Err(DataError::Shape {
                expected,
                found: data.len(),
            });
        }
        let block = replicates * timepoints;
        let matrices = data
            .chunks(block)
            .map(|chunk| ReplicateMatrix::new(replicates, timepoints, chunk.to_vec()))
            .collect();
        Ok(Self {
            factors: matrices,
            labels: default_labels(factors),
            replicates,
            timepoints,
        })
    }

    /// Build from nested `[factor][replicate][timepoint]` vectors.
    pub fn from_nested(data: &[Vec<Vec<f64>>]) -> Result<Self, DataError> {
        let replicates = data.first().map_or(0, Vec::len);
        let timepoints = data
            .first()
            .and_then(|f| f.first())
            .map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(data.len() * replicates * timepoints);
        for (f, factor) in data.iter().enumerate() {
            if factor.len() != replicates {
                return Err(DataError::ReplicateCount {
                    factor: f,
                    expected: replicates,
                    found: factor.len(),
                });
            }
            for (r, row) in factor.iter().enumerate() {
                if row.len() != timepoints {
                    return Err(DataError::Ragged {
                        factor: f,
                        replicate: r,
                        expected: timepoints,
                        found: row.len(),
                    });
                }
                flat.extend_from_slice(row);
            }
        }
        Self::new(data.len(), replicates, timepoints, flat)
    }

    /// Build a single-replicate tensor from one series per factor.
    pub fn from_series(series: &[Vec<f64>]) -> Result<Self, DataError> {
        let nested: Vec<Vec<Vec<f64>>> = series.iter().map(|s| vec![s.clone()]).collect();
        Self::from_nested(&nested)
    }

    /// Replace the factor labels.
    pub fn with_labels<S: Into<String>>(mut self, labels: Vec<S>) -> Result<Self, DataError> {
        if labels.len() != self.factors.len() {
            return Err(DataError::Labels {
                expected: self.factors.len(),
                found: labels.len(),
            });
        }
        self.labels = labels.into_iter().map(Into::into).collect();
        Ok(self)
    }

    /// Factor count.
    pub fn factors(&self) -> usize {
        self.factors.len()
    }

    /// Replicates per factor.
    pub fn replicates(&self) -> usize {
        self.replicates
    }

    /// Timepoints per replicate.
    pub fn timepoints(&self) -> usize {
        self.timepoints
    }

    /// Replicate matrix of factor `i`.
    pub fn factor(&self, i: usize) -> &ReplicateMatrix {
        &self.factors[i]
    }

    /// Label of factor `i`.
    pub fn label(&self, i: usize) -> &str {
        &self.labels[i]
    }

    /// All labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Fill interior gaps of every replicate series.
    pub fn fill_missing(&self, method: crate::pipeline::FillMethod) -> Self {
        let factors = self
            .factors
            .iter()
            .map(|m| m.map_rows(|row| crate::pipeline::fill_missing(row, method)))
            .collect();
        Self {
            factors,
            labels: self.labels.clone(),
            replicates: self.replicates,
            timepoints: self.timepoints,
        }
    }

    /// Check that `other` can be compared against `self`.
    pub fn check_compatible(&self, other: &Self) -> Result<(), DataError> {
        if self.replicates != other.replicates || self.timepoints != other.timepoints {
            return Err(DataError::Incompatible {
                first: (self.replicates, self.timepoints),
                second: (other.replicates, other.timepoints),
            });
        }
        Ok(())
    }
}

fn default_labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_becomes_invalid() {
        let s = MaskedSeries::from_values(&[1.0, f64::NAN, 3.0]);
        assert_eq!(s.valid_count(), 2);
        assert_eq!(s.get(1), None);
        assert_eq!(s.values()[1], 0.0);
        assert_eq!(s.compressed(), vec![1.0, 3.0]);
    }

    #[test]
    fn map_propagates_invalidity() {
        let s = MaskedSeries::from_values(&[1.0, f64::NAN, 0.0]);
        let inv = s.map(|x| 1.0 / x);
        assert_eq!(inv.get(0), Some(1.0));
        assert_eq!(inv.get(1), None);
        // 1/0 is not finite
        assert_eq!(inv.get(2), None);
    }

    #[test]
    fn replicate_mean_skips_missing() {
        let m = ReplicateMatrix::from_rows(&[
            vec![1.0, f64::NAN, f64::NAN],
            vec![3.0, 4.0, f64::NAN],
        ])
        .unwrap();
        let mean = m.replicate_mean();
        assert_eq!(mean.get(0), Some(2.0));
        assert_eq!(mean.get(1), Some(4.0));
        assert_eq!(mean.get(2), None);
    }

    #[test]
    fn occurrence_counts_nonzero_timepoints() {
        let m = ReplicateMatrix::from_rows(&[vec![0.0, 1.0, f64::NAN, 2.0]]).unwrap();
        assert!((m.occurrence() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn permute_moves_replicates_together() {
        let m = ReplicateMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let mut out = m.clone();
        m.permute_timepoints_into(&[2, 0, 1], &mut out);
        assert_eq!(out.row(0).compressed(), vec![3.0, 1.0, 2.0]);
        assert_eq!(out.row(1).compressed(), vec![6.0, 4.0, 5.0]);
    }

    #[test]
    fn tensor_shape_errors() {
        assert!(matches!(
            SeriesTensor::new(2, 1, 3, vec![0.0; 5]),
            Err(DataError::Shape { expected: 6, found: 5 })
        ));
        assert!(matches!(
            SeriesTensor::new(0, 1, 3, vec![]),
            Err(DataError::Empty { .. })
        ));
        let ragged = vec![vec![vec![1.0, 2.0]], vec![vec![1.0]]];
        assert!(matches!(
            SeriesTensor::from_nested(&ragged),
            Err(DataError::Ragged { factor: 1, .. })
        ));
    }

    #[test]
    fn tensor_default_labels() {
        let t = SeriesTensor::from_series(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(t.labels(), &["1".to_string(), "2".to_string()]);
        let t = t.with_labels(vec!["a", "b"]).unwrap();
        assert_eq!(t.label(1), "b");
    }
}
