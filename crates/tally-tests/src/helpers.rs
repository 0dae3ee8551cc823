//! Shared fixtures for integration tests.

use std::sync::Arc;

use tally_core::fixed::tokens;
use tally_core::ledger::MemoryLedger;
use tally_core::types::{Amount, HolderId};
use tally_settle::{SettlementConfig, SettlementEngine, SettlementQueue};

/// Height at which the test asset is born.
pub const BORN: u64 = 1_000;

/// Total supply of the test asset, in whole tokens.
pub const SUPPLY: u128 = 100_000_000;

/// Install a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Deterministic holder address from a label.
pub fn holder(label: &str) -> HolderId {
    HolderId::from_label(label)
}

/// The reserve account rewards are paid from.
pub fn reserve() -> HolderId {
    holder("reserve")
}

/// A ledger, engine and queue wired together.
pub struct Fixture {
    pub ledger: Arc<MemoryLedger>,
    pub engine: Arc<SettlementEngine>,
    pub queue: SettlementQueue,
}

impl Fixture {
    /// Total paid out so far.
    pub fn paid(&self) -> Amount {
        self.engine.snapshot().total_paid
    }
}

/// Build a fixture: `holders` (label, whole tokens) at genesis, the reserve
/// holding the remainder of [`SUPPLY`], and `pool` whole tokens deposited.
pub fn fixture(holders: &[(&str, u128)], pool: u128) -> Fixture {
    fixture_with(holders, tokens(pool), SettlementConfig::default())
}

/// Like [`fixture`] with base-unit balances, pool and an explicit config.
pub fn fixture_with(holders: &[(&str, u128)], pool: Amount, config: SettlementConfig) -> Fixture {
    init_tracing();
    let ledger = Arc::new(MemoryLedger::new(BORN, reserve()));
    let mut allocated: Amount = 0;
    for (label, amount) in holders {
        let amount = tokens(*amount);
        ledger.allocate_genesis(holder(label), amount).unwrap();
        allocated += amount;
    }
    ledger
        .allocate_genesis(reserve(), tokens(SUPPLY) - allocated)
        .unwrap();

    let engine = Arc::new(SettlementEngine::new(ledger.clone(), ledger.clone(), &config).unwrap());
    if pool > 0 {
        engine.deposit(pool).unwrap();
    }
    let queue = SettlementQueue::new(Arc::clone(&engine), &config).unwrap();
    Fixture {
        ledger,
        engine,
        queue,
    }
}
