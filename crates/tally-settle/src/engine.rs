//! Claim settlement engine.
//!
//! A claim pays the holder a share of the *remaining* pool:
//!
//! ```text
//! weight  = holder units over [last_claim, height)
//! total   = supply * (height - genesis)
//! ratio   = floor(weight * RATIO_PRECISION / total)
//! payout  = floor(funds * ratio / RATIO_PRECISION)
//! ```
//!
//! The pool shrinks with every payout, so each claim is priced against what
//! earlier claims left behind, and a holder's weight restarts at their claim
//! height. Pool state and reward records live behind one mutex; every claim
//! is a single read-modify-write under that lock, including the asset
//! transfer, so claims are linearizable and a failed transfer commits nothing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use tally_core::error::{ClaimError, ConfigError, PoolError};
use tally_core::fixed::mul_div_floor;
use tally_core::traits::{CheckpointLedger, RewardTransfer, WeightCalculator};
use tally_core::types::{Amount, ClaimReceipt, HolderId, PoolSnapshot, RewardRecord, Weight};
use tally_weight::WeightEngine;

use crate::config::SettlementConfig;
use crate::pool::RewardPool;

/// Mutable settlement state. Only ever touched under the engine lock.
#[derive(Default)]
struct SettlementState {
    pool: RewardPool,
    records: HashMap<HolderId, RewardRecord>,
}

/// Serializing settlement authority over a single reward pool.
pub struct SettlementEngine {
    ledger: Arc<dyn CheckpointLedger>,
    payer: Arc<dyn RewardTransfer>,
    weights: Arc<dyn WeightCalculator>,
    ratio_precision: u128,
    state: Mutex<SettlementState>,
}

impl SettlementEngine {
    /// Create an engine with the production [`WeightEngine`].
    ///
    /// Fails if `config` does not validate.
    pub fn new(
        ledger: Arc<dyn CheckpointLedger>,
        payer: Arc<dyn RewardTransfer>,
        config: &SettlementConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_calculator(ledger, payer, Arc::new(WeightEngine::new()), config)
    }

    /// Create an engine with a custom weight calculator.
    pub fn with_calculator(
        ledger: Arc<dyn CheckpointLedger>,
        payer: Arc<dyn RewardTransfer>,
        weights: Arc<dyn WeightCalculator>,
        config: &SettlementConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ledger,
            payer,
            weights,
            ratio_precision: config.ratio_precision,
            state: Mutex::new(SettlementState::default()),
        })
    }

    /// Add funds to the pool. Returns the new pool balance.
    ///
    /// Called by whatever brings value into the pool (e.g. registration fees).
    pub fn deposit(&self, amount: Amount) -> Result<Amount, PoolError> {
        let funds = self.state.lock().pool.deposit(amount)?;
        info!(amount, funds, "pool deposit");
        Ok(funds)
    }

    /// Settle a claim for `holder` at `height`.
    ///
    /// # Errors
    ///
    /// - [`ClaimError::InvalidHeight`] if `height` precedes genesis or the holder's last claim
    /// - [`ClaimError::NothingToClaim`] if the payout rounds to zero
    /// - [`ClaimError::InsufficientFunds`] if the pool cannot cover the payout
    /// - [`ClaimError::TransferFailed`] if the asset transfer fails; nothing is committed
    pub fn claim(&self, holder: &HolderId, height: u64) -> Result<ClaimReceipt, ClaimError> {
        let mut state = self.state.lock();
        let receipt = self.quote(&state, holder, height)?;
        if receipt.payout == 0 {
            debug!(%holder, height, weight = receipt.weight, "nothing to claim");
            return Err(ClaimError::NothingToClaim);
        }

        let mut pool = state.pool.clone();
        pool.withdraw(receipt.payout)?;

        if let Err(err) = self.payer.transfer(holder, receipt.payout, height) {
            warn!(%holder, height, payout = receipt.payout, error = %err, "reward transfer failed");
            return Err(ClaimError::TransferFailed(err));
        }

        state.pool = pool;
        let record = state.records.entry(*holder).or_default();
        record.claimed = receipt.total_claimed;
        record.last_claimed_height = Some(height);
        record.claims += 1;

        info!(
            %holder,
            height,
            payout = receipt.payout,
            total_claimed = receipt.total_claimed,
            pool_after = receipt.pool_after,
            "claim settled"
        );
        Ok(receipt)
    }

    /// Price a claim without committing it.
    ///
    /// A zero payout is returned as a receipt, not an error.
    pub fn preview_claim(&self, holder: &HolderId, height: u64) -> Result<ClaimReceipt, ClaimError> {
        let state = self.state.lock();
        self.quote(&state, holder, height)
    }

    /// Cumulative rewards paid to `holder`.
    pub fn claimed(&self, holder: &HolderId) -> Amount {
        self.state
            .lock()
            .records
            .get(holder)
            .map_or(0, |r| r.claimed)
    }

    /// The holder's reward record, if they have ever claimed.
    pub fn record(&self, holder: &HolderId) -> Option<RewardRecord> {
        self.state.lock().records.get(holder).cloned()
    }

    /// Unclaimed holder units at `height`: accrued since the holder's last claim.
    pub fn weight(&self, holder: &HolderId, height: u64) -> Result<Weight, ClaimError> {
        let since = self.last_claimed_height(holder);
        let checkpoints = self.ledger.checkpoints(holder)?;
        Ok(self.weights.compute_weight(&checkpoints, since, height)?)
    }

    /// Funds currently available in the pool.
    pub fn pool_funds(&self) -> Amount {
        self.state.lock().pool.current_funds()
    }

    /// Point-in-time view of pool accounting.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();
        PoolSnapshot {
            funds: state.pool.current_funds(),
            total_deposited: state.pool.total_deposited(),
            total_paid: state.pool.total_paid(),
            claimants: state.records.len(),
        }
    }

    fn last_claimed_height(&self, holder: &HolderId) -> Option<u64> {
        self.state
            .lock()
            .records
            .get(holder)
            .and_then(|r| r.last_claimed_height)
    }

    /// Compute the receipt a claim at `height` would produce against `state`.
    fn quote(
        &self,
        state: &SettlementState,
        holder: &HolderId,
        height: u64,
    ) -> Result<ClaimReceipt, ClaimError> {
        let genesis = self.ledger.genesis_height();
        if height < genesis {
            return Err(ClaimError::InvalidHeight {
                height,
                reason: format!("precedes genesis {genesis}"),
            });
        }

        let record = state.records.get(holder).cloned().unwrap_or_default();
        if let Some(last) = record.last_claimed_height {
            if height < last {
                return Err(ClaimError::InvalidHeight {
                    height,
                    reason: format!("precedes last claim at {last}"),
                });
            }
        }

        let checkpoints = self.ledger.checkpoints(holder)?;
        let weight = self
            .weights
            .compute_weight(&checkpoints, record.last_claimed_height, height)?;
        let supply = self.ledger.total_supply()?;
        let total_weight = self.weights.total_weight(supply, genesis, height)?;

        let ratio = if total_weight == 0 {
            0
        } else {
            mul_div_floor(weight, self.ratio_precision, total_weight)
                .ok_or(ClaimError::ArithmeticOverflow)?
        };

        let funds = state.pool.current_funds();
        let payout = mul_div_floor(funds, ratio, self.ratio_precision)
            .ok_or(ClaimError::ArithmeticOverflow)?;
        let pool_after = funds
            .checked_sub(payout)
            .ok_or(ClaimError::InsufficientFunds { have: funds, need: payout })?;
        let total_claimed = record
            .claimed
            .checked_add(payout)
            .ok_or(ClaimError::ArithmeticOverflow)?;

        debug!(%holder, height, weight, total_weight, ratio, payout, "quoted claim");
        Ok(ClaimReceipt {
            holder: *holder,
            height,
            weight,
            total_weight,
            ratio,
            payout,
            total_claimed,
            pool_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::error::{LedgerError, TransferError, WeightError};
    use tally_core::fixed::{parse_units, tokens};
    use tally_core::ledger::MemoryLedger;
    use tally_core::types::Checkpoint;

    const BORN: u64 = 1_000;

    fn holder(label: &str) -> HolderId {
        HolderId::from_label(label)
    }

    /// 100M supply: `holders` at genesis, the reserve holds the rest.
    fn setup(holders: &[(&str, u128)], pool: u128) -> (Arc<MemoryLedger>, SettlementEngine) {
        let reserve = holder("reserve");
        let ledger = Arc::new(MemoryLedger::new(BORN, reserve));
        let mut allocated = 0;
        for (label, amount) in holders {
            ledger.allocate_genesis(holder(label), tokens(*amount)).unwrap();
            allocated += tokens(*amount);
        }
        ledger.allocate_genesis(reserve, tokens(100_000_000) - allocated).unwrap();
        let engine =
            SettlementEngine::new(ledger.clone(), ledger.clone(), &SettlementConfig::default()).unwrap();
        engine.deposit(tokens(pool)).unwrap();
        (ledger, engine)
    }

    #[test]
    fn single_claim_takes_proportional_share() {
        let (_, engine) = setup(&[("alice", 40_000_000)], 4_000);
        let receipt = engine.claim(&holder("alice"), BORN + 1_000).unwrap();
        assert_eq!(receipt.weight, tokens(40_000_000_000));
        assert_eq!(receipt.total_weight, tokens(100_000_000_000));
        assert_eq!(receipt.ratio, 4_000_000);
        assert_eq!(receipt.payout, tokens(1_600));
        assert_eq!(receipt.pool_after, tokens(2_400));
        assert_eq!(engine.claimed(&holder("alice")), tokens(1_600));
    }

    #[test]
    fn payout_is_delivered_to_holder() {
        let (ledger, engine) = setup(&[("alice", 40_000_000)], 4_000);
        engine.claim(&holder("alice"), BORN + 1_000).unwrap();
        assert_eq!(ledger.balance(&holder("alice")), tokens(40_001_600));
        assert_eq!(
            ledger.checkpoints(&holder("alice")).unwrap().last(),
            Some(&Checkpoint::new(BORN + 1_000, tokens(40_001_600)))
        );
    }

    #[test]
    fn second_claim_same_height_is_nothing() {
        let (_, engine) = setup(&[("alice", 40_000_000)], 4_000);
        engine.claim(&holder("alice"), BORN + 1_000).unwrap();
        assert_eq!(
            engine.claim(&holder("alice"), BORN + 1_000),
            Err(ClaimError::NothingToClaim)
        );
        assert_eq!(engine.claimed(&holder("alice")), tokens(1_600));
        assert_eq!(engine.record(&holder("alice")).unwrap().claims, 1);
    }

    #[test]
    fn repeated_claims_pay_decreasing_marginals() {
        let (_, engine) = setup(&[("alice", 40_000_000)], 4_000);
        let alice = holder("alice");
        let r1 = engine.claim(&alice, BORN + 1_000).unwrap();
        let r2 = engine.claim(&alice, BORN + 5_000).unwrap();
        let r3 = engine.claim(&alice, BORN + 10_000).unwrap();
        assert_eq!(r2.weight, parse_units("160006400000").unwrap());
        assert_eq!(r2.payout, parse_units("768.03072").unwrap());
        assert_eq!(r3.weight, parse_units("200011840153.6").unwrap());
        assert!(r1.payout > r2.payout && r2.payout > r3.payout);
        assert_eq!(r3.total_claimed, r1.payout + r2.payout + r3.payout);
    }

    #[test]
    fn claim_at_genesis_is_nothing() {
        let (_, engine) = setup(&[("alice", 1_000)], 4_000);
        assert_eq!(engine.claim(&holder("alice"), BORN), Err(ClaimError::NothingToClaim));
    }

    #[test]
    fn claim_before_genesis_is_invalid() {
        let (_, engine) = setup(&[("alice", 1_000)], 4_000);
        assert!(matches!(
            engine.claim(&holder("alice"), BORN - 1),
            Err(ClaimError::InvalidHeight { height, .. }) if height == BORN - 1
        ));
    }

    #[test]
    fn claim_before_last_claim_is_invalid() {
        let (_, engine) = setup(&[("alice", 40_000_000)], 4_000);
        engine.claim(&holder("alice"), BORN + 1_000).unwrap();
        assert!(matches!(
            engine.claim(&holder("alice"), BORN + 999),
            Err(ClaimError::InvalidHeight { .. })
        ));
    }

    #[test]
    fn unknown_holder_has_nothing() {
        let (_, engine) = setup(&[("alice", 1_000)], 4_000);
        assert_eq!(engine.claim(&holder("nobody"), BORN + 50), Err(ClaimError::NothingToClaim));
        assert!(engine.record(&holder("nobody")).is_none());
    }

    #[test]
    fn empty_pool_has_nothing() {
        let reserve = holder("reserve");
        let ledger = Arc::new(MemoryLedger::new(BORN, reserve));
        ledger.allocate_genesis(holder("alice"), tokens(10)).unwrap();
        let engine =
            SettlementEngine::new(ledger.clone(), ledger, &SettlementConfig::default()).unwrap();
        assert_eq!(engine.claim(&holder("alice"), BORN + 10), Err(ClaimError::NothingToClaim));
    }

    #[test]
    fn transfer_failure_commits_nothing() {
        let (ledger, engine) = setup(&[("alice", 40_000_000)], 4_000);
        ledger.freeze_transfers(true);
        let err = engine.claim(&holder("alice"), BORN + 1_000).unwrap_err();
        assert!(matches!(err, ClaimError::TransferFailed(TransferError::Rejected(_))));
        assert_eq!(engine.pool_funds(), tokens(4_000));
        assert_eq!(engine.claimed(&holder("alice")), 0);
        assert!(engine.record(&holder("alice")).is_none());
        assert_eq!(ledger.balance(&holder("alice")), tokens(40_000_000));

        ledger.freeze_transfers(false);
        let receipt = engine.claim(&holder("alice"), BORN + 1_000).unwrap();
        assert_eq!(receipt.payout, tokens(1_600));
    }

    #[test]
    fn oversized_weight_is_insufficient_funds() {
        // Ledger supply understates the holder's balance: ratio exceeds 1.
        struct Skewed(MemoryLedger);
        impl CheckpointLedger for Skewed {
            fn checkpoints(&self, h: &HolderId) -> Result<Vec<Checkpoint>, LedgerError> {
                self.0.checkpoints(h)
            }
            fn genesis_height(&self) -> u64 {
                self.0.genesis_height()
            }
            fn total_supply(&self) -> Result<Amount, LedgerError> {
                Ok(1)
            }
        }

        let reserve = holder("reserve");
        let inner = MemoryLedger::new(BORN, reserve);
        inner.allocate_genesis(holder("alice"), tokens(10)).unwrap();
        let ledger = Arc::new(Skewed(inner));
        let payer = Arc::new(MemoryLedger::new(BORN, reserve));
        let engine =
            SettlementEngine::new(ledger, payer, &SettlementConfig::default()).unwrap();
        engine.deposit(tokens(5)).unwrap();
        assert!(matches!(
            engine.claim(&holder("alice"), BORN + 10),
            Err(ClaimError::InsufficientFunds { .. })
        ));
        assert_eq!(engine.pool_funds(), tokens(5));
    }

    #[test]
    fn ledger_errors_propagate() {
        struct Offline;
        impl CheckpointLedger for Offline {
            fn checkpoints(&self, _: &HolderId) -> Result<Vec<Checkpoint>, LedgerError> {
                Err(LedgerError::Unavailable("offline".into()))
            }
            fn genesis_height(&self) -> u64 {
                0
            }
            fn total_supply(&self) -> Result<Amount, LedgerError> {
                Ok(0)
            }
        }
        let payer = Arc::new(MemoryLedger::new(0, HolderId::ZERO));
        let engine =
            SettlementEngine::new(Arc::new(Offline), payer, &SettlementConfig::default()).unwrap();
        assert_eq!(
            engine.claim(&holder("alice"), 5),
            Err(ClaimError::Ledger(LedgerError::Unavailable("offline".into())))
        );
    }

    #[test]
    fn unordered_history_is_a_weight_error() {
        struct Broken;
        impl CheckpointLedger for Broken {
            fn checkpoints(&self, _: &HolderId) -> Result<Vec<Checkpoint>, LedgerError> {
                Ok(vec![Checkpoint::new(5, 1), Checkpoint::new(3, 1)])
            }
            fn genesis_height(&self) -> u64 {
                0
            }
            fn total_supply(&self) -> Result<Amount, LedgerError> {
                Ok(10)
            }
        }
        let payer = Arc::new(MemoryLedger::new(0, HolderId::ZERO));
        let engine =
            SettlementEngine::new(Arc::new(Broken), payer, &SettlementConfig::default()).unwrap();
        assert_eq!(
            engine.claim(&holder("alice"), 10),
            Err(ClaimError::Weight(WeightError::UnorderedCheckpoints { height: 3 }))
        );
    }

    #[test]
    fn preview_does_not_mutate() {
        let (_, engine) = setup(&[("alice", 40_000_000)], 4_000);
        let preview = engine.preview_claim(&holder("alice"), BORN + 1_000).unwrap();
        assert_eq!(preview.payout, tokens(1_600));
        assert_eq!(engine.pool_funds(), tokens(4_000));
        assert_eq!(engine.claimed(&holder("alice")), 0);
        let receipt = engine.claim(&holder("alice"), BORN + 1_000).unwrap();
        assert_eq!(preview, receipt);
    }

    #[test]
    fn weight_query_resets_after_claim() {
        let (_, engine) = setup(&[("alice", 40_000_000)], 4_000);
        let alice = holder("alice");
        assert_eq!(engine.weight(&alice, BORN + 1_000).unwrap(), tokens(40_000_000_000));
        engine.claim(&alice, BORN + 1_000).unwrap();
        assert_eq!(engine.weight(&alice, BORN + 1_000).unwrap(), 0);
        assert_eq!(engine.weight(&alice, BORN + 1_001).unwrap(), tokens(40_001_600));
    }

    #[test]
    fn snapshot_tracks_conservation() {
        let (_, engine) = setup(&[("alice", 40_000_000), ("bob", 20_000_000)], 4_000);
        engine.claim(&holder("alice"), BORN + 2_000).unwrap();
        engine.claim(&holder("bob"), BORN + 3_000).unwrap();
        let snap = engine.snapshot();
        assert_eq!(snap.claimants, 2);
        assert_eq!(snap.total_paid, tokens(1_600) + tokens(480));
        assert_eq!(snap.funds + snap.total_paid, snap.total_deposited);
    }

    #[test]
    fn zero_ratio_precision_rejected_at_construction() {
        let ledger = Arc::new(MemoryLedger::new(BORN, holder("reserve")));
        let config = SettlementConfig {
            ratio_precision: 0,
            ..SettlementConfig::default()
        };
        let err = SettlementEngine::new(ledger.clone(), ledger, &config).err();
        assert_eq!(err, Some(ConfigError::Zero("ratio_precision")));
    }

    #[test]
    fn custom_calculator_config_is_validated() {
        let ledger = Arc::new(MemoryLedger::new(BORN, holder("reserve")));
        let config = SettlementConfig {
            log_format: "yaml".to_string(),
            ..SettlementConfig::default()
        };
        let result = SettlementEngine::with_calculator(
            ledger.clone(),
            ledger,
            Arc::new(WeightEngine::new()),
            &config,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn deposit_grows_pool() {
        let (_, engine) = setup(&[("alice", 1)], 4_000);
        assert_eq!(engine.deposit(tokens(50)).unwrap(), tokens(4_050));
        assert_eq!(engine.deposit(0), Err(PoolError::ZeroDeposit));
    }
}
