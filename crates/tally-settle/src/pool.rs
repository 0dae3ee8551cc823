//! Reward pool accounting.
//!
//! Funds enter only through [`RewardPool::deposit`] and leave only through
//! [`RewardPool::withdraw`]. At all times
//! `funds + total_paid == total_deposited`.

use serde::{Deserialize, Serialize};

use tally_core::error::PoolError;
use tally_core::types::Amount;

/// The shrinking reward reservoir.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardPool {
    funds: Amount,
    total_deposited: Amount,
    total_paid: Amount,
}

impl RewardPool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Funds currently available for distribution.
    pub fn current_funds(&self) -> Amount {
        self.funds
    }

    /// Everything ever deposited.
    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    /// Everything ever paid out.
    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }

    /// Add `amount` to the pool. Returns the new balance.
    pub fn deposit(&mut self, amount: Amount) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Err(PoolError::ZeroDeposit);
        }
        let funds = self
            .funds
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        let total_deposited = self
            .total_deposited
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        self.funds = funds;
        self.total_deposited = total_deposited;
        Ok(funds)
    }

    /// Remove `amount` from the pool. Returns the new balance.
    ///
    /// Never partially applied: on error the pool is unchanged.
    pub fn withdraw(&mut self, amount: Amount) -> Result<Amount, PoolError> {
        if amount > self.funds {
            return Err(PoolError::InsufficientFunds {
                have: self.funds,
                need: amount,
            });
        }
        let total_paid = self
            .total_paid
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        self.funds -= amount;
        self.total_paid = total_paid;
        Ok(self.funds)
    }
}
