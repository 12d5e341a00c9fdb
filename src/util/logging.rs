//! Tracing setup for the binary

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "FEDCARRIER_LOG";

/// Filter from `FEDCARRIER_LOG`, else `default_level`
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize tracing, logging to stderr so results on stdout stay clean
pub fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_default_level() {
        // Only meaningful when the variable is unset in the test environment
        if std::env::var(LOG_ENV).is_err() {
            assert!(env_filter("debug").to_string().contains("debug"));
        }
    }
}
