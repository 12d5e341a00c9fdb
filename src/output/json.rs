//! JSON output formatting
//!
//! Reports serialize as `{"operation": ..., "result": ...}`. Undefined correlations
//! (NaN) are written as `null`.

use super::Report;
use anyhow::{Context, Result};

/// Pretty-printed JSON of a report
pub fn format_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{CorrelationMatrix, FitReport};
    use crate::pipeline::Metric;
    use serde_json::Value;

    #[test]
    fn test_column_names_json() {
        let names = ["b", "a"].iter().map(|s| s.to_string()).collect();
        let json = format_report(&Report::ColumnNames(names)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["operation"], "column_names");
        assert_eq!(value["result"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_correlation_nan_is_null() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "k".to_string()],
            values: vec![vec![1.0, f64::NAN], vec![f64::NAN, f64::NAN]],
        };
        let json = format_report(&Report::Correlation(matrix)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["result"]["values"][0][0], 1.0);
        assert!(value["result"]["values"][0][1].is_null());
    }

    #[test]
    fn test_fit_json() {
        let report = FitReport {
            metric: Metric::MeanSquaredError,
            score: 0.5,
            train_rows: 8,
            test_rows: 4,
        };
        let json = format_report(&Report::Fit(report)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["operation"], "fit");
        assert_eq!(value["result"]["metric"], "mean_squared_error");
        assert_eq!(value["result"]["test_rows"], 4);
    }
}
