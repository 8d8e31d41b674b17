//! JSON serialization for result rows and run summaries.

use std::io::Write;

use serde::Serialize;

use super::ResultSink;
use crate::error::SinkError;
use crate::result::ResultRow;

/// Serialize any result record to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for result types).
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Serialize any result record to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for result types).
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Writes one JSON object per row, newline-delimited.
///
/// Undefined values serialize as `null`.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn write_header(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn write_rows(&mut self, rows: &[ResultRow]) -> Result<(), SinkError> {
        for row in rows {
            serde_json::to_writer(&mut self.writer, row)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Emission;
    use crate::result::{PairStatus, RunSummary};

    #[test]
    fn test_to_json() {
        let row = ResultRow::sentinel(1, 2, "a", "b", PairStatus::EmptyAlignment);
        let json = to_json(&row).unwrap();
        assert!(json.contains("\"x_start\":-1"));
        assert!(json.contains("\"pearson\":null"));
        assert!(json.contains("\"EmptyAlignment\""));
    }

    #[test]
    fn test_to_json_pretty() {
        let summary = RunSummary::new(Emission::Streaming { batch_size: 4 });
        let json = to_json_pretty(&summary).unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("batch_size"));
    }

    #[test]
    fn lines_parse_back() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let rows = vec![
            ResultRow::sentinel(0, 1, "a", "b", PairStatus::NoData),
            ResultRow::sentinel(0, 2, "a", "c", PairStatus::Failed),
        ];
        sink.write_rows(&rows).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let back: Vec<ResultRow> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(back, rows);
    }
}
