//! Settlement configuration.
//!
//! Provides [`SettlementConfig`] with defaults for the share precision,
//! per-block queue capacity, drain order and logging. Values can be set
//! programmatically, deserialized, or read from `TALLY_*` environment
//! variables.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use tally_core::constants::{DEFAULT_MAX_BATCH, RATIO_PRECISION};
use tally_core::error::ConfigError;

/// Order in which claims queued for the same block are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainOrder {
    /// Submission order.
    #[default]
    Fifo,
    /// Uniformly random order, chosen per block.
    Shuffled,
}

impl FromStr for DrainOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "shuffled" => Ok(Self::Shuffled),
            other => Err(ConfigError::InvalidValue {
                key: "drain_order".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration for a settlement engine and its queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Denominator of the holder share ratio.
    pub ratio_precision: u128,
    /// Maximum claims accepted per block.
    pub max_batch: usize,
    /// Commit order for claims in the same block.
    pub drain_order: DrainOrder,
    /// Log level filter string (e.g. "info", "tally_settle=debug").
    pub log_level: String,
    /// Log output format ("text" or "json").
    pub log_format: String,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            ratio_precision: RATIO_PRECISION,
            max_batch: DEFAULT_MAX_BATCH,
            drain_order: DrainOrder::Fifo,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl SettlementConfig {
    /// Load configuration from `TALLY_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Keys: `TALLY_RATIO_PRECISION`, `TALLY_MAX_BATCH`, `TALLY_DRAIN_ORDER`,
    /// `TALLY_LOG_LEVEL`, `TALLY_LOG_FORMAT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("TALLY_RATIO_PRECISION") {
            cfg.ratio_precision = parse_value("TALLY_RATIO_PRECISION", &v)?;
        }
        if let Some(v) = lookup("TALLY_MAX_BATCH") {
            cfg.max_batch = parse_value("TALLY_MAX_BATCH", &v)?;
        }
        if let Some(v) = lookup("TALLY_DRAIN_ORDER") {
            cfg.drain_order = v.parse()?;
        }
        if let Some(v) = lookup("TALLY_LOG_LEVEL") {
            cfg.log_level = v;
        }
        if let Some(v) = lookup("TALLY_LOG_FORMAT") {
            cfg.log_format = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ratio_precision == 0 {
            return Err(ConfigError::Zero("ratio_precision"));
        }
        if self.max_batch == 0 {
            return Err(ConfigError::Zero("max_batch"));
        }
        if self.log_format != "text" && self.log_format != "json" {
            return Err(ConfigError::InvalidValue {
                key: "log_format".to_string(),
                value: self.log_format.clone(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
