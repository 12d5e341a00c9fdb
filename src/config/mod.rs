//! Configuration module
//!
//! Handles CLI argument parsing, TOML collaboration files, and validation.

pub mod cli;
pub mod toml;
pub mod validator;

use crate::client::{LocalCollaboration, PeerId};
use crate::pipeline::Metric;
use crate::table::Table;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Complete master configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub master: MasterConfig,
    /// Peers of the local collaboration
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load every peer table into an in-process collaboration
    pub fn collaboration(&self) -> Result<LocalCollaboration> {
        self.peers
            .iter()
            .try_fold(LocalCollaboration::new(), |collaboration, peer| {
                Ok(collaboration.with_peer(peer.id, peer.load()?))
            })
    }
}

/// Settings of the master-side operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Completion polls before a task times out
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait between two completion polls (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Minimum number of joined rows for correlation and fitting
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    /// Share of joined rows held out for scoring (0.0-1.0, exclusive)
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed of the train/test shuffle
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,
    /// Scoring metric, the estimator's default when unset
    #[serde(default)]
    pub metric: Option<Metric>,
}

fn default_max_attempts() -> u32 {
    40
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_min_rows() -> usize {
    2
}

fn default_test_fraction() -> f64 {
    crate::analytics::split::DEFAULT_TEST_FRACTION
}

fn default_split_seed() -> u64 {
    42
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
            min_rows: default_min_rows(),
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
            metric: None,
        }
    }
}

/// One peer of the local collaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Peer id within the collaboration
    pub id: PeerId,
    /// JSON table file (`{"columns": [...], "rows": [[...], ...]}`)
    pub data: PathBuf,
}

impl PeerConfig {
    /// Read and parse the peer's table
    pub fn load(&self) -> Result<Table> {
        let contents = fs::read_to_string(&self.data).with_context(|| {
            format!("Failed to read data of peer {}: {}", self.id, self.data.display())
        })?;

        serde_json::from_str(&contents).with_context(|| {
            format!("Failed to parse data of peer {}: {}", self.id, self.data.display())
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `FEDCARRIER_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write results to this file instead of stdout
    pub path: Option<PathBuf>,
}

/// Rendering of operation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_master_defaults() {
        let master = MasterConfig::default();
        assert_eq!(master.max_attempts, 40);
        assert_eq!(master.poll_interval_ms, 1000);
        assert_eq!(master.min_rows, 2);
        assert!((master.test_fraction - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(master.metric, None);
    }

    #[test]
    fn test_peer_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("peer.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{"columns": ["id", "age"], "rows": [[1, 30.5], [2, null]]}}"#).unwrap();

        let peer = PeerConfig { id: 7, data: path };
        let table = peer.load().unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.columns(), &["id".to_string(), "age".to_string()]);
    }

    #[test]
    fn test_peer_load_errors() {
        let dir = TempDir::new().unwrap();

        let missing = PeerConfig {
            id: 1,
            data: dir.path().join("nope.json"),
        };
        assert!(missing.load().is_err());

        let ragged = dir.path().join("ragged.json");
        fs::write(&ragged, r#"{"columns": ["a", "b"], "rows": [[1]]}"#).unwrap();
        let peer = PeerConfig { id: 2, data: ragged };
        assert!(peer.load().is_err());
    }

    #[test]
    fn test_collaboration_from_peers() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        for id in [1, 2] {
            let path = dir.path().join(format!("peer{}.json", id));
            fs::write(&path, r#"{"columns": ["id"], "rows": [[1]]}"#).unwrap();
            config.peers.push(PeerConfig { id, data: path });
        }

        let collaboration = config.collaboration().unwrap();
        assert_eq!(collaboration.num_peers(), 2);
    }
}
