//! Human-readable text output

use super::Report;
use crate::analytics::{CorrelationMatrix, FitReport};
use crate::pipeline::PipelineDescription;
use std::fmt::Write;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Text rendering of a report
pub fn format_report(report: &Report) -> String {
    match report {
        Report::ColumnNames(names) => {
            let mut out = banner("COLUMN NAMES");
            for name in names {
                let _ = writeln!(out, "  {}", name);
            }
            let _ = write!(out, "Total: {} columns", names.len());
            out
        }
        Report::Correlation(matrix) => format_correlation(matrix),
        Report::Fit(fit) => format_fit(fit),
        Report::Pipeline(description) => format_pipeline(description),
        Report::Hash(digest) => digest.clone(),
    }
}

fn banner(title: &str) -> String {
    format!("{}\n{:^59}\n{}\n", RULE, title, RULE)
}

fn format_correlation(matrix: &CorrelationMatrix) -> String {
    let mut out = banner("CORRELATION MATRIX");
    if matrix.is_empty() {
        out.push_str("No numeric columns");
        return out;
    }

    let width = matrix
        .columns
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(0)
        .max(7);

    let _ = write!(out, "{:width$}", "", width = width);
    for column in &matrix.columns {
        let _ = write!(out, "  {:>width$}", column, width = width);
    }

    for (column, row) in matrix.columns.iter().zip(&matrix.values) {
        let _ = write!(out, "\n{:width$}", column, width = width);
        for value in row {
            let cell = if value.is_nan() {
                "NaN".to_string()
            } else {
                format!("{:.4}", value)
            };
            let _ = write!(out, "  {:>width$}", cell, width = width);
        }
    }

    out
}

fn format_fit(fit: &FitReport) -> String {
    let mut out = banner("MODEL FIT");
    let _ = writeln!(out, "Rows:   {} train / {} held out", fit.train_rows, fit.test_rows);
    let _ = write!(out, "Score:  {} = {:.6}", fit.metric, fit.score);
    out
}

fn format_pipeline(description: &PipelineDescription) -> String {
    let mut out = banner("PIPELINE");
    for (i, step) in description.steps.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} ({})", i + 1, step.name, step.kind);
    }
    if !description.params.is_empty() {
        out.push_str("Parameters:\n");
        for (key, value) in &description.params {
            let _ = writeln!(out, "  {} = {}", key, value);
        }
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Metric;

    #[test]
    fn test_column_names_text() {
        let names = ["age", "id"].iter().map(|s| s.to_string()).collect();
        let text = format_report(&Report::ColumnNames(names));

        assert!(text.contains("COLUMN NAMES"));
        assert!(text.contains("  age\n  id\n"));
        assert!(text.ends_with("Total: 2 columns"));
    }

    #[test]
    fn test_correlation_text() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "b".to_string()],
            values: vec![vec![1.0, -0.5], vec![-0.5, f64::NAN]],
        };
        let text = format_report(&Report::Correlation(matrix));

        assert!(text.contains("1.0000"));
        assert!(text.contains("-0.5000"));
        assert!(text.contains("NaN"));
    }

    #[test]
    fn test_empty_correlation_text() {
        let matrix = CorrelationMatrix {
            columns: vec![],
            values: vec![],
        };
        assert!(format_report(&Report::Correlation(matrix)).ends_with("No numeric columns"));
    }

    #[test]
    fn test_fit_text() {
        let fit = FitReport {
            metric: Metric::Accuracy,
            score: 0.75,
            train_rows: 6,
            test_rows: 3,
        };
        let text = format_report(&Report::Fit(fit));

        assert!(text.contains("6 train / 3 held out"));
        assert!(text.contains("accuracy = 0.750000"));
    }

    #[test]
    fn test_hash_text_is_bare_digest() {
        assert_eq!(format_report(&Report::Hash("xyz".to_string())), "xyz");
    }
}
