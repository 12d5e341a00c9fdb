//! Configuration validation

use super::*;
use anyhow::Result;
use std::collections::HashSet;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_master(&config.master)?;
    validate_peers(&config.peers)?;
    validate_logging(&config.logging)?;

    Ok(())
}

/// Validate master settings
pub fn validate_master(master: &MasterConfig) -> Result<()> {
    if master.max_attempts == 0 {
        anyhow::bail!("max_attempts must be at least 1");
    }

    if master.min_rows == 0 {
        anyhow::bail!("min_rows must be at least 1");
    }

    if !(master.test_fraction > 0.0 && master.test_fraction < 1.0) {
        anyhow::bail!(
            "test_fraction must be between 0.0 and 1.0 (exclusive), got {}",
            master.test_fraction
        );
    }

    Ok(())
}

/// Validate peer list (ids must be unique)
pub fn validate_peers(peers: &[PeerConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for (i, peer) in peers.iter().enumerate() {
        if !seen.insert(peer.id) {
            anyhow::bail!("Peer {} has duplicate id {}", i, peer.id);
        }
    }

    Ok(())
}

/// Validate logging settings
pub fn validate_logging(logging: &LoggingConfig) -> Result<()> {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        anyhow::bail!(
            "logging level must be one of {}, got '{}'",
            LOG_LEVELS.join(", "),
            logging.level
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_attempts() {
        let master = MasterConfig {
            max_attempts: 0,
            ..MasterConfig::default()
        };
        let err = validate_master(&master).unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_zero_min_rows() {
        let master = MasterConfig {
            min_rows: 0,
            ..MasterConfig::default()
        };
        assert!(validate_master(&master).is_err());
    }

    #[test]
    fn test_test_fraction_bounds() {
        for fraction in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let master = MasterConfig {
                test_fraction: fraction,
                ..MasterConfig::default()
            };
            assert!(validate_master(&master).is_err(), "fraction {}", fraction);
        }

        let master = MasterConfig {
            test_fraction: 0.25,
            ..MasterConfig::default()
        };
        assert!(validate_master(&master).is_ok());
    }

    #[test]
    fn test_duplicate_peer_ids() {
        let peers = vec![
            PeerConfig {
                id: 1,
                data: PathBuf::from("a.json"),
            },
            PeerConfig {
                id: 1,
                data: PathBuf::from("b.json"),
            },
        ];
        let err = validate_peers(&peers).unwrap_err();
        assert!(err.to_string().contains("duplicate id 1"));
    }

    #[test]
    fn test_logging_level() {
        let logging = LoggingConfig {
            level: "DEBUG".to_string(),
        };
        assert!(validate_logging(&logging).is_ok());

        let logging = LoggingConfig {
            level: "loud".to_string(),
        };
        assert!(validate_logging(&logging).is_err());
    }
}
