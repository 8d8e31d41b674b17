//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::config::Emission;
use crate::result::{PairStatus, ResultRow, RunSummary};

/// Format a run summary for human-readable terminal output.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("lsa-stats\n");
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    output.push_str(&format!("  Pairs: {}\n", summary.pairs));
    output.push_str(&format!(
        "    {} analyzed\n",
        summary.analyzed.to_string().green()
    ));
    if summary.no_data > 0 {
        output.push_str(&format!("    {} without data\n", summary.no_data));
    }
    if summary.empty_alignment > 0 {
        output.push_str(&format!(
            "    {} with empty alignment\n",
            summary.empty_alignment
        ));
    }
    if summary.failed > 0 {
        output.push_str(&format!(
            "    {}\n",
            format!("{} failed", summary.failed).red().bold()
        ));
    }
    output.push('\n');

    match summary.emission {
        Emission::Buffered => output.push_str("  Emission: buffered\n"),
        Emission::Streaming { batch_size } => {
            output.push_str(&format!("  Emission: streaming (batches of {batch_size})\n"));
        }
    }
    if !summary.q_values_computed {
        output.push_str(&format!(
            "  {}\n",
            "\u{26A0} q-values not computed in streaming mode".yellow()
        ));
    }
    output.push_str(&format!("  Runtime: {:.2}s\n", summary.runtime_secs));
    output.push('\n');
    output.push_str(&sep);
    output.push('\n');
    output
}

/// One-line description of a row; significant rows (`p <= alpha`) are highlighted.
pub fn format_row(row: &ResultRow, alpha: f64) -> String {
    let pair = format!("{} ~ {}", row.x_label, row.y_label);
    match row.status {
        PairStatus::NoData => format!("{pair}: {}", "no data".dimmed()),
        PairStatus::Failed => format!("{pair}: {}", "failed".red()),
        PairStatus::EmptyAlignment => format!("{pair}: {}", "empty alignment".dimmed()),
        PairStatus::Analyzed => {
            let p = row
                .p_value
                .map_or_else(|| "undefined".to_string(), |p| format!("{p:.4}"));
            let line = format!(
                "{pair}: LS {:+.4} [{:+.4}, {:+.4}] delay {} len {} p {}",
                row.score, row.ci_low, row.ci_high, row.delay, row.align_len, p
            );
            match row.p_value {
                Some(p) if p <= alpha => line.green().bold().to_string(),
                _ => line,
            }
        }
    }
}
