//! Result output
//!
//! Every CLI operation produces one `Report`, rendered as text or JSON and written to
//! stdout or a file.

pub mod json;
pub mod text;

use crate::analytics::{CorrelationMatrix, FitReport};
use crate::config::{OutputConfig, OutputFormat};
use crate::pipeline::PipelineDescription;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;

/// Result of one operation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "operation", content = "result", rename_all = "snake_case")]
pub enum Report {
    ColumnNames(BTreeSet<String>),
    Correlation(CorrelationMatrix),
    Fit(FitReport),
    /// Sanitized pipeline, as rebuilt
    Pipeline(PipelineDescription),
    Hash(String),
}

/// Render a report in the requested format
pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::format_report(report)),
        OutputFormat::Json => json::format_report(report),
    }
}

/// Render and write a report to the configured destination
pub fn write_report(report: &Report, output: &OutputConfig) -> Result<()> {
    let rendered = render(report, output.format)?;

    match &output.path {
        Some(path) => fs::write(path, rendered + "\n")
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => println!("{}", rendered),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_report_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let output = OutputConfig {
            format: OutputFormat::Json,
            path: Some(path.clone()),
        };

        write_report(&Report::Hash("abc".to_string()), &output).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["operation"], "hash");
        assert_eq!(value["result"], "abc");
    }

    #[test]
    fn test_write_report_bad_path() {
        let dir = TempDir::new().unwrap();
        let output = OutputConfig {
            format: OutputFormat::Text,
            path: Some(dir.path().join("missing").join("out.txt")),
        };

        let err = write_report(&Report::Hash("abc".to_string()), &output).unwrap_err();
        assert!(err.to_string().contains("Failed to write output file"));
    }
}
