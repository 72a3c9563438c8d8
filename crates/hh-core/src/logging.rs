//! Logging setup

use crate::config::Config;
use tracing_subscriber::EnvFilter;

/// Build the filter for a configuration; `RUST_LOG` takes precedence
pub fn filter_for(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.debug.log_level.as_filter()))
}

/// Install the global subscriber
///
/// Returns false if a subscriber was already installed, which happens when
/// tests or an embedding application set one up first.
pub fn init(config: &Config) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(config))
        .with_target(true)
        .try_init()
        .is_ok()
}
