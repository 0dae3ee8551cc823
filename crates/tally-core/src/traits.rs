//! Trait interfaces between settlement and its collaborators.
//!
//! - [`CheckpointLedger`]: read-only balance history (external ledger implements)
//! - [`RewardTransfer`]: reward asset movement (external token implements)
//! - [`WeightCalculator`]: holder-unit math (tally-weight implements)

use crate::error::{LedgerError, TransferError, WeightError};
use crate::types::{Amount, Checkpoint, HolderId, Weight};

/// Read-only view of per-holder balance history.
///
/// Checkpoints are appended by the ledger whenever a balance changes;
/// settlement never writes them.
pub trait CheckpointLedger: Send + Sync {
    /// All balance checkpoints for `holder`, ordered by height.
    /// Returns an empty vec for unknown holders.
    fn checkpoints(&self, holder: &HolderId) -> Result<Vec<Checkpoint>, LedgerError>;

    /// Height at which the asset came into existence.
    fn genesis_height(&self) -> u64;

    /// Total supply of the held asset in base units.
    fn total_supply(&self) -> Result<Amount, LedgerError>;

    /// Balance of `holder` effective at `height`.
    ///
    /// Default implementation scans [`checkpoints`](Self::checkpoints).
    fn balance_at(&self, holder: &HolderId, height: u64) -> Result<Amount, LedgerError> {
        Ok(self
            .checkpoints(holder)?
            .iter()
            .take_while(|cp| cp.height <= height)
            .last()
            .map_or(0, |cp| cp.balance))
    }
}

/// Moves the reward asset out of the pool to a holder.
pub trait RewardTransfer: Send + Sync {
    /// Pay `amount` to `to`, effective at `height`.
    ///
    /// Must be all-or-nothing: on error no value has moved.
    fn transfer(&self, to: &HolderId, amount: Amount, height: u64) -> Result<(), TransferError>;
}

/// Pure holder-unit computation.
///
/// Weight is the time-integral of balance: each checkpoint's balance times
/// the number of blocks it was in effect.
pub trait WeightCalculator: Send + Sync {
    /// Holder units accrued over `[since, target)`.
    ///
    /// `since = None` integrates from the first checkpoint. Heights before the
    /// first checkpoint contribute nothing.
    fn compute_weight(
        &self,
        checkpoints: &[Checkpoint],
        since: Option<u64>,
        target: u64,
    ) -> Result<Weight, WeightError>;

    /// Units held by the whole supply over `[genesis, target)`.
    fn total_weight(&self, supply: Amount, genesis: u64, target: u64) -> Result<Weight, WeightError>;
}
