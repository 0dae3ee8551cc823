//! # tally-settle: Reward pool settlement.
//!
//! Composes the settlement authority:
//! - [`pool::RewardPool`]: deposit/withdraw accounting for the reward reservoir
//! - [`engine::SettlementEngine`]: linearizable claim pricing and commit
//! - [`queue::SettlementQueue`]: per-block batching of simultaneous claims
//! - [`service`]: tokio actor for async submitters
//! - [`config::SettlementConfig`]: engine and queue configuration

pub mod config;
pub mod engine;
pub mod logging;
pub mod pool;
pub mod queue;
pub mod service;

pub use config::{DrainOrder, SettlementConfig};
pub use engine::SettlementEngine;
pub use logging::init_logging;
pub use pool::RewardPool;
pub use queue::{BlockSummary, SettledClaim, SettlementQueue};
pub use service::{PendingClaim, SettlementHandle};
