//! Weight engine implementing the [`WeightCalculator`] trait.
//!
//! Integrates balance over block height. All arithmetic is checked u128;
//! a product that does not fit is an error, never a wrap.

use tally_core::error::WeightError;
use tally_core::traits::WeightCalculator;
use tally_core::types::{Amount, Checkpoint, Weight};
use tracing::trace;

use crate::interval::intervals;

/// The production weight calculator.
///
/// Stateless: the same checkpoints and range always produce the same weight.
#[derive(Debug, Clone, Default)]
pub struct WeightEngine;

impl WeightEngine {
    /// Create a new WeightEngine.
    pub fn new() -> Self {
        Self
    }
}

impl WeightCalculator for WeightEngine {
    fn compute_weight(
        &self,
        checkpoints: &[Checkpoint],
        since: Option<u64>,
        target: u64,
    ) -> Result<Weight, WeightError> {
        let Some(first) = checkpoints.first() else {
            return Ok(0);
        };
        let since = since.unwrap_or(first.height.min(target));

        let mut weight: Weight = 0;
        for span in intervals(checkpoints, since, target)? {
            let units = span
                .balance
                .checked_mul(span.blocks() as u128)
                .ok_or(WeightError::ArithmeticOverflow)?;
            weight = weight
                .checked_add(units)
                .ok_or(WeightError::ArithmeticOverflow)?;
        }

        trace!(since, target, weight, "computed holder weight");
        Ok(weight)
    }

    fn total_weight(&self, supply: Amount, genesis: u64, target: u64) -> Result<Weight, WeightError> {
        if target < genesis {
            return Err(WeightError::InvalidRange {
                since: genesis,
                target,
            });
        }
        supply
            .checked_mul((target - genesis) as u128)
            .ok_or(WeightError::ArithmeticOverflow)
    }
}
