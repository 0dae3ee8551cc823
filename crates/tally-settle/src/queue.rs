//! Per-block settlement queue.
//!
//! Claims submitted during a block are held until the block is settled, then
//! committed one at a time against the engine. The commit order is chosen by
//! the queue ([`DrainOrder`]), never by the submitters.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use tally_core::error::{ClaimError, ConfigError, QueueError};
use tally_core::types::{Amount, ClaimReceipt, HolderId};

use crate::config::{DrainOrder, SettlementConfig};
use crate::engine::SettlementEngine;

/// A queued claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    pub ticket: u64,
    pub holder: HolderId,
}

/// Result of one queued claim after its block was settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettledClaim {
    pub ticket: u64,
    pub holder: HolderId,
    pub outcome: Result<ClaimReceipt, ClaimError>,
}

/// Totals for one settled block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockSummary {
    pub height: u64,
    pub settled: usize,
    pub failed: usize,
    pub paid: Amount,
}

impl BlockSummary {
    /// Summarise a block's outcomes.
    pub fn from_outcomes(height: u64, outcomes: &[SettledClaim]) -> Self {
        let mut summary = Self {
            height,
            ..Self::default()
        };
        for claim in outcomes {
            match &claim.outcome {
                Ok(receipt) => {
                    summary.settled += 1;
                    summary.paid = summary.paid.saturating_add(receipt.payout);
                }
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Bounded queue of claims drained once per block.
pub struct SettlementQueue {
    engine: Arc<SettlementEngine>,
    pending: Mutex<VecDeque<ClaimRequest>>,
    next_ticket: AtomicU64,
    capacity: usize,
    order: DrainOrder,
}

impl SettlementQueue {
    /// Create a queue in front of `engine`. Fails if `config` does not validate.
    pub fn new(
        engine: Arc<SettlementEngine>,
        config: &SettlementConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine,
            pending: Mutex::new(VecDeque::new()),
            next_ticket: AtomicU64::new(0),
            capacity: config.max_batch,
            order: config.drain_order,
        })
    }

    /// The engine claims are committed against.
    pub fn engine(&self) -> &Arc<SettlementEngine> {
        &self.engine
    }

    /// Queue a claim for the next settled block. Returns its ticket.
    pub fn submit(&self, holder: HolderId) -> Result<u64, QueueError> {
        let mut pending = self.pending.lock();
        if pending.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        pending.push_back(ClaimRequest { ticket, holder });
        debug!(ticket, %holder, "claim queued");
        Ok(ticket)
    }

    /// Number of claims waiting for the next block.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Settle every pending claim at `height` in the configured order.
    pub fn settle_block(&self, height: u64) -> Vec<SettledClaim> {
        self.settle_block_with(height, &mut rand::thread_rng())
    }

    /// Like [`settle_block`](Self::settle_block) with a caller-supplied RNG
    /// for the shuffled order.
    pub fn settle_block_with<R: Rng + ?Sized>(&self, height: u64, rng: &mut R) -> Vec<SettledClaim> {
        let mut batch: Vec<ClaimRequest> = self.pending.lock().drain(..).collect();
        if self.order == DrainOrder::Shuffled {
            batch.shuffle(rng);
        }
        self.commit(height, batch)
    }

    /// Settle `batch` at `height` in exactly the given order.
    ///
    /// Bypasses the pending queue; used when the caller has already fixed an order.
    pub fn settle_in_order(&self, height: u64, holders: &[HolderId]) -> Vec<SettledClaim> {
        let batch = holders
            .iter()
            .map(|holder| ClaimRequest {
                ticket: self.next_ticket.fetch_add(1, Ordering::Relaxed),
                holder: *holder,
            })
            .collect();
        self.commit(height, batch)
    }

    fn commit(&self, height: u64, batch: Vec<ClaimRequest>) -> Vec<SettledClaim> {
        let outcomes: Vec<SettledClaim> = batch
            .into_iter()
            .map(|req| SettledClaim {
                ticket: req.ticket,
                holder: req.holder,
                outcome: self.engine.claim(&req.holder, height),
            })
            .collect();

        let summary = BlockSummary::from_outcomes(height, &outcomes);
        info!(
            height,
            settled = summary.settled,
            failed = summary.failed,
            paid = summary.paid,
            "block settled"
        );
        outcomes
    }
}
