//! Tab-separated result table.

use std::io::Write;

use super::ResultSink;
use crate::constants::DISPLAY_DECIMALS;
use crate::error::SinkError;
use crate::result::ResultRow;
use crate::statistics::{Correlation, ShiftedCorrelation};

/// Column names, in order.
pub const TSV_HEADER: [&str; 27] = [
    "X", "Y", "LS", "lowCI", "upCI", "Xs", "Ys", "Len", "Delay", "P", "PCC", "Ppcc", "SPCC",
    "Pspcc", "Dspcc", "SCC", "Pscc", "SSCC", "Psscc", "Dsscc", "Q", "Qpcc", "Qspcc", "Qscc",
    "Qsscc", "Xi", "Yi",
];

/// Writes one tab-separated line per row.
///
/// Floats are rounded to 8 decimals; undefined values print as `nan`.
/// `Xi`/`Yi` are 1-based factor indices.
#[derive(Debug)]
pub struct TsvSink<W: Write> {
    writer: W,
}

impl<W: Write> TsvSink<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn num(v: f64) -> String {
    if !v.is_finite() {
        return "nan".to_string();
    }
    let scale = 10f64.powi(DISPLAY_DECIMALS);
    let rounded = (v * scale).round() / scale;
    // Avoid "-0".
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "nan".to_string(), num)
}

fn corr(c: Option<Correlation>) -> [String; 2] {
    [opt(c.map(|c| c.r)), opt(c.map(|c| c.p))]
}

fn shifted(c: Option<ShiftedCorrelation>) -> [String; 3] {
    [
        opt(c.map(|c| c.r)),
        opt(c.map(|c| c.p)),
        c.map_or_else(|| "nan".to_string(), |c| c.delay.to_string()),
    ]
}

/// Format one row as TSV fields.
pub(crate) fn fields(row: &ResultRow) -> Vec<String> {
    let mut out = vec![
        row.x_label.clone(),
        row.y_label.clone(),
        num(row.score),
        num(row.ci_low),
        num(row.ci_high),
        row.x_start.to_string(),
        row.y_start.to_string(),
        row.align_len.to_string(),
        row.delay.to_string(),
        opt(row.p_value),
    ];
    out.extend(corr(row.pearson));
    out.extend(shifted(row.shifted_pearson));
    out.extend(corr(row.spearman));
    out.extend(shifted(row.shifted_spearman));
    let q = &row.q_values;
    out.extend(
        [q.lsa, q.pearson, q.shifted_pearson, q.spearman, q.shifted_spearman]
            .into_iter()
            .map(opt),
    );
    out.push((row.i + 1).to_string());
    out.push((row.j + 1).to_string());
    out
}

impl<W: Write> ResultSink for TsvSink<W> {
    fn write_header(&mut self) -> Result<(), SinkError> {
        writeln!(self.writer, "{}", TSV_HEADER.join("\t"))?;
        Ok(())
    }

    fn write_rows(&mut self, rows: &[ResultRow]) -> Result<(), SinkError> {
        for row in rows {
            writeln!(self.writer, "{}", fields(row).join("\t"))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
