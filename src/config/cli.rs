//! CLI argument parsing using clap

use crate::client::PeerId;
use crate::config::OutputFormat;
use crate::pipeline::Metric;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fedcarrier - federated analytics master
#[derive(Parser, Debug)]
#[command(name = "fedcarrier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Collaboration file (TOML) listing peers and master settings
    #[arg(short, long, env = "FEDCARRIER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Completion polls before a task times out
    #[arg(long, env = "FEDCARRIER_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Wait between two completion polls (milliseconds)
    #[arg(long, env = "FEDCARRIER_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Minimum number of joined rows
    #[arg(long, env = "FEDCARRIER_MIN_ROWS")]
    pub min_rows: Option<usize>,

    /// Output format
    #[arg(long, value_enum, env = "FEDCARRIER_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write results to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Union of the column names of all peers
    ColumnNames {
        /// Peer ids to leave out (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<PeerId>,
    },

    /// Correlation matrix of the joined peer data
    Correlation {
        /// Join key columns (comma-separated), natural join when omitted
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,
    },

    /// Fit a pipeline on the joined peer data and score it on held-out rows
    Fit {
        /// Pipeline description (JSON)
        #[arg(long)]
        pipeline: PathBuf,

        /// Feature columns (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        features: Vec<String>,

        /// Target column
        #[arg(long)]
        target: String,

        /// Join key columns (comma-separated), natural join when omitted
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,

        /// Scoring metric (default: the estimator's)
        #[arg(long, value_enum)]
        metric: Option<Metric>,

        /// Share of rows held out for scoring
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Seed of the train/test shuffle
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate and rebuild a pipeline description without fitting it
    Sanitize {
        /// Pipeline description (JSON)
        #[arg(long)]
        pipeline: PathBuf,
    },

    /// Salted SHA-512 hash of an identifier
    Hash {
        /// Salt (exactly 128 characters)
        #[arg(long, env = "FEDCARRIER_SALT", hide_env_values = true)]
        salt: String,

        /// Value to hash
        input: String,
    },
}

impl Command {
    /// Whether the command talks to the peers
    pub fn needs_peers(&self) -> bool {
        matches!(
            self,
            Command::ColumnNames { .. } | Command::Correlation { .. } | Command::Fit { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_names() {
        let cli = Cli::try_parse_from(["fedcarrier", "column-names", "--exclude", "1,3"]).unwrap();
        assert_eq!(cli.command, Command::ColumnNames { exclude: vec![1, 3] });
        assert!(cli.command.needs_peers());
    }

    #[test]
    fn test_parse_correlation_keys() {
        let cli = Cli::try_parse_from([
            "fedcarrier",
            "--config",
            "collab.toml",
            "correlation",
            "--keys",
            "first_name,last_name",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("collab.toml")));
        assert_eq!(
            cli.command,
            Command::Correlation {
                keys: vec!["first_name".to_string(), "last_name".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_fit_requires_features() {
        let result = Cli::try_parse_from([
            "fedcarrier",
            "fit",
            "--pipeline",
            "p.json",
            "--target",
            "y",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_hash() {
        let cli = Cli::try_parse_from(["fedcarrier", "hash", "--salt", "s", "value"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Hash {
                salt: "s".to_string(),
                input: "value".to_string()
            }
        );
        assert!(!cli.command.needs_peers());
    }
}
