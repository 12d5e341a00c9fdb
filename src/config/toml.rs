//! TOML configuration file parsing

use super::*;
use crate::config::cli::{Cli, Command};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
///
/// Relative peer data paths are resolved against the directory of the file.
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if let Some(base) = path.parent() {
        for peer in &mut config.peers {
            if peer.data.is_relative() {
                peer.data = base.join(&peer.data);
            }
        }
    }

    Ok(config)
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    // Master settings
    if let Some(max_attempts) = cli.max_attempts {
        config.master.max_attempts = max_attempts;
    }
    if let Some(poll_interval_ms) = cli.poll_interval_ms {
        config.master.poll_interval_ms = poll_interval_ms;
    }
    if let Some(min_rows) = cli.min_rows {
        config.master.min_rows = min_rows;
    }

    // Fitting settings only exist on the fit subcommand
    if let Command::Fit {
        metric,
        test_fraction,
        seed,
        ..
    } = &cli.command
    {
        if metric.is_some() {
            config.master.metric = *metric;
        }
        if let Some(test_fraction) = test_fraction {
            config.master.test_fraction = *test_fraction;
        }
        if let Some(seed) = seed {
            config.master.split_seed = *seed;
        }
    }

    // Output
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(path) = &cli.output {
        config.output.path = Some(path.clone());
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_parse_toml_basic() {
        let toml = r#"
[master]
max_attempts = 10
poll_interval_ms = 250
min_rows = 5

[[peers]]
id = 1
data = "/data/peer1.json"

[[peers]]
id = 2
data = "/data/peer2.json"

[logging]
level = "debug"

[output]
format = "json"
"#;

        let config = parse_toml_string(toml).unwrap();

        assert_eq!(config.master.max_attempts, 10);
        assert_eq!(config.master.poll_interval_ms, 250);
        assert_eq!(config.master.min_rows, 5);
        assert_eq!(config.master.split_seed, 42);
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.peers[1].id, 2);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let config = parse_toml_string("").unwrap();

        assert_eq!(config.master, MasterConfig::default());
        assert!(config.peers.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_parse_toml_metric() {
        let config = parse_toml_string("[master]\nmetric = \"accuracy\"\n").unwrap();
        assert_eq!(config.master.metric, Some(Metric::Accuracy));
    }

    #[test]
    fn test_parse_toml_invalid() {
        assert!(parse_toml_string("[master]\nmax_attempts = \"many\"\n").is_err());
        assert!(parse_toml_string("[[peers]]\nid = 1\n").is_err());
    }

    #[test]
    fn test_parse_toml_file_resolves_peer_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collaboration.toml");
        fs::write(
            &path,
            "[[peers]]\nid = 1\ndata = \"peer1.json\"\n\n[[peers]]\nid = 2\ndata = \"/abs/peer2.json\"\n",
        )
        .unwrap();

        let config = parse_toml_file(&path).unwrap();

        assert_eq!(config.peers[0].data, dir.path().join("peer1.json"));
        assert_eq!(config.peers[1].data, PathBuf::from("/abs/peer2.json"));
    }

    #[test]
    fn test_parse_toml_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = parse_toml_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_merge_cli_overrides() {
        let cli = Cli::try_parse_from([
            "fedcarrier",
            "--max-attempts",
            "3",
            "--format",
            "json",
            "fit",
            "--pipeline",
            "p.json",
            "--features",
            "a,b",
            "--target",
            "y",
            "--metric",
            "accuracy",
            "--seed",
            "7",
        ])
        .unwrap();

        let config = merge_cli_with_config(&cli, Config::default());

        assert_eq!(config.master.max_attempts, 3);
        assert_eq!(config.master.poll_interval_ms, 1000);
        assert_eq!(config.master.metric, Some(Metric::Accuracy));
        assert_eq!(config.master.split_seed, 7);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_merge_cli_keeps_toml_values() {
        let cli = Cli::try_parse_from(["fedcarrier", "column-names"]).unwrap();
        let mut config = Config::default();
        config.master.min_rows = 9;

        let config = merge_cli_with_config(&cli, config);

        assert_eq!(config.master.min_rows, 9);
        assert_eq!(config.output.format, OutputFormat::Text);
    }
}
