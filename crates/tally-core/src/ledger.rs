//! In-memory checkpoint ledger.
//!
//! [`MemoryLedger`] records a checkpoint on every balance change and pays
//! rewards out of a designated reserve account, so a reward payment shows up
//! in the recipient's balance history at the claim height. It is suitable for
//! tests and simulations; production deployments read checkpoints from the
//! token's own ledger.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{LedgerError, TransferError};
use crate::traits::{CheckpointLedger, RewardTransfer};
use crate::types::{Amount, Checkpoint, HolderId};

#[derive(Default)]
struct LedgerState {
    /// Holder → checkpoints, strictly increasing in height.
    history: HashMap<HolderId, Vec<Checkpoint>>,
    /// Sum of all genesis allocations.
    supply: Amount,
    /// When set, reward transfers are rejected.
    frozen: bool,
}

impl LedgerState {
    fn balance(&self, holder: &HolderId) -> Amount {
        self.history
            .get(holder)
            .and_then(|h| h.last())
            .map_or(0, |cp| cp.balance)
    }

    fn last_height(&self, holder: &HolderId) -> Option<u64> {
        self.history.get(holder).and_then(|h| h.last()).map(|cp| cp.height)
    }

    /// Append a checkpoint, folding same-height changes into one entry.
    fn record(&mut self, holder: HolderId, height: u64, balance: Amount) {
        let entries = self.history.entry(holder).or_default();
        match entries.last_mut() {
            Some(last) if last.height == height => last.balance = balance,
            _ => entries.push(Checkpoint::new(height, balance)),
        }
    }

    /// Move `amount` between holders at `height`. Nothing changes on error.
    fn apply_transfer(
        &mut self,
        genesis_height: u64,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
        height: u64,
    ) -> Result<(), LedgerError> {
        if height < genesis_height {
            return Err(LedgerError::BeforeGenesis {
                height,
                genesis: genesis_height,
            });
        }
        for holder in [from, to] {
            if let Some(last) = self.last_height(holder) {
                if height < last {
                    return Err(LedgerError::NonMonotonicHeight { height, last });
                }
            }
        }

        let from_balance = self.balance(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: from.to_string(),
                have: from_balance,
                need: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = self
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;

        self.record(*from, height, from_balance - amount);
        self.record(*to, height, to_balance);
        Ok(())
    }
}

/// Balance history kept in memory behind a `RwLock`.
pub struct MemoryLedger {
    genesis_height: u64,
    /// Account that reward payments are drawn from.
    reserve: HolderId,
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    /// Create an empty ledger whose asset is born at `genesis_height`.
    pub fn new(genesis_height: u64, reserve: HolderId) -> Self {
        Self {
            genesis_height,
            reserve,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// The account reward payments are drawn from.
    pub fn reserve(&self) -> HolderId {
        self.reserve
    }

    /// Credit `amount` to `holder` at genesis, growing the supply.
    pub fn allocate_genesis(&self, holder: HolderId, amount: Amount) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let supply = state
            .supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        let balance = state
            .balance(&holder)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        if let Some(last) = state.last_height(&holder) {
            if last > self.genesis_height {
                return Err(LedgerError::NonMonotonicHeight {
                    height: self.genesis_height,
                    last,
                });
            }
        }
        state.supply = supply;
        state.record(holder, self.genesis_height, balance);
        Ok(())
    }

    /// Move `amount` from `from` to `to` at `height`, appending checkpoints
    /// for both sides. Nothing changes on error.
    pub fn transfer_between(
        &self,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
        height: u64,
    ) -> Result<(), LedgerError> {
        self.state
            .write()
            .apply_transfer(self.genesis_height, from, to, amount, height)
    }

    /// Latest balance of `holder`.
    pub fn balance(&self, holder: &HolderId) -> Amount {
        self.state.read().balance(holder)
    }

    /// Reject (`true`) or accept (`false`) subsequent reward transfers.
    pub fn freeze_transfers(&self, frozen: bool) {
        self.state.write().frozen = frozen;
    }
}

impl CheckpointLedger for MemoryLedger {
    fn checkpoints(&self, holder: &HolderId) -> Result<Vec<Checkpoint>, LedgerError> {
        Ok(self.state.read().history.get(holder).cloned().unwrap_or_default())
    }

    fn genesis_height(&self) -> u64 {
        self.genesis_height
    }

    fn total_supply(&self) -> Result<Amount, LedgerError> {
        Ok(self.state.read().supply)
    }
}

impl RewardTransfer for MemoryLedger {
    fn transfer(&self, to: &HolderId, amount: Amount, height: u64) -> Result<(), TransferError> {
        // Frozen flag and balances under one write lock.
        let mut state = self.state.write();
        if state.frozen {
            return Err(TransferError::Rejected("transfers frozen".to_string()));
        }
        state.apply_transfer(self.genesis_height, &self.reserve, to, amount, height)?;
        Ok(())
    }
}
