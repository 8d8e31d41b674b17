//! Output formatting for analysis results.
//!
//! Rows leave the orchestrator through a [`ResultSink`]. Buffered runs call
//! `write_rows` once; streaming runs call it once per batch, in order.

mod json;
mod terminal;
mod tsv;

pub use json::{to_json, to_json_pretty, JsonLinesSink};
pub use terminal::{format_row, format_summary};
pub use tsv::{TsvSink, TSV_HEADER};

use crate::error::SinkError;
use crate::result::ResultRow;

/// Destination for result rows.
pub trait ResultSink {
    /// Called once before any row.
    fn write_header(&mut self) -> Result<(), SinkError>;

    /// Append rows in emission order.
    fn write_rows(&mut self, rows: &[ResultRow]) -> Result<(), SinkError>;

    /// Called once after the last row.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn write_header(&mut self) -> Result<(), SinkError> {
        (**self).write_header()
    }

    fn write_rows(&mut self, rows: &[ResultRow]) -> Result<(), SinkError> {
        (**self).write_rows(rows)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Collects rows in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    rows: Vec<ResultRow>,
    batches: usize,
}

impl VecSink {
    /// Rows received so far.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of `write_rows` calls.
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Take the collected rows.
    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }
}

impl ResultSink for VecSink {
    fn write_header(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn write_rows(&mut self, rows: &[ResultRow]) -> Result<(), SinkError> {
        self.batches += 1;
        self.rows.extend_from_slice(rows);
        Ok(())
    }
}
