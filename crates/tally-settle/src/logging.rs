//! Tracing subscriber setup for processes embedding the settlement engine.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::SettlementConfig;

/// Install a global subscriber using the config's level and format.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_logging(config: &SettlementConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init()
            .is_ok()
    }
}
