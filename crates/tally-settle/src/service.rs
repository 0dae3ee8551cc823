//! Async settlement service.
//!
//! A single tokio task owns the [`SettlementQueue`]; submitters talk to it
//! through a [`SettlementHandle`]. A submitted claim resolves when the block
//! it landed in is sealed. Dropping every handle stops the task, and any
//! claim still pending resolves to [`QueueError::Stopped`].

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tally_core::error::{ClaimError, QueueError, TallyError};
use tally_core::types::{ClaimReceipt, HolderId};

use crate::queue::{BlockSummary, SettlementQueue};

type Outcome = Result<ClaimReceipt, ClaimError>;

enum Command {
    Submit {
        holder: HolderId,
        accepted: oneshot::Sender<Result<u64, QueueError>>,
        settled: oneshot::Sender<Outcome>,
    },
    Seal {
        height: u64,
        reply: oneshot::Sender<BlockSummary>,
    },
}

/// A claim waiting for its block to be sealed.
#[derive(Debug)]
pub struct PendingClaim {
    ticket: u64,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingClaim {
    /// Queue ticket assigned at submission.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Wait for the claim to be settled.
    pub async fn outcome(self) -> Result<ClaimReceipt, TallyError> {
        let outcome = self.rx.await.map_err(|_| QueueError::Stopped)?;
        Ok(outcome?)
    }
}

/// Cloneable handle to a running settlement service.
#[derive(Clone)]
pub struct SettlementHandle {
    tx: mpsc::Sender<Command>,
}

impl SettlementHandle {
    /// Submit a claim for the next sealed block.
    pub async fn submit(&self, holder: HolderId) -> Result<PendingClaim, QueueError> {
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let (settled_tx, settled_rx) = oneshot::channel();
        self.tx
            .send(Command::Submit {
                holder,
                accepted: accepted_tx,
                settled: settled_tx,
            })
            .await
            .map_err(|_| QueueError::Stopped)?;
        let ticket = accepted_rx.await.map_err(|_| QueueError::Stopped)??;
        Ok(PendingClaim {
            ticket,
            rx: settled_rx,
        })
    }

    /// Settle every claim submitted so far at `height`.
    pub async fn seal_block(&self, height: u64) -> Result<BlockSummary, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Seal { height, reply })
            .await
            .map_err(|_| QueueError::Stopped)?;
        rx.await.map_err(|_| QueueError::Stopped)
    }
}

/// Spawn the settlement task on the current tokio runtime.
///
/// The task takes ownership of `queue`; only sealing through a handle drains
/// it. `channel_capacity` bounds in-flight commands, not queued claims; the
/// queue's own capacity still applies.
pub fn spawn(
    queue: SettlementQueue,
    channel_capacity: usize,
) -> (SettlementHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let task = tokio::spawn(run(queue, rx));
    (SettlementHandle { tx }, task)
}

async fn run(queue: SettlementQueue, mut rx: mpsc::Receiver<Command>) {
    let mut waiting: HashMap<u64, oneshot::Sender<Outcome>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Submit {
                holder,
                accepted,
                settled,
            } => match queue.submit(holder) {
                Ok(ticket) => {
                    waiting.insert(ticket, settled);
                    let _ = accepted.send(Ok(ticket));
                }
                Err(err) => {
                    let _ = accepted.send(Err(err));
                }
            },
            Command::Seal { height, reply } => {
                let outcomes = queue.settle_block(height);
                let summary = BlockSummary::from_outcomes(height, &outcomes);
                for claim in outcomes {
                    if let Some(tx) = waiting.remove(&claim.ticket) {
                        // The submitter may have stopped waiting.
                        let _ = tx.send(claim.outcome);
                    }
                }
                let _ = reply.send(summary);
            }
        }
    }

    debug!(abandoned = waiting.len(), "settlement handles dropped");
    info!("settlement service stopped");
}
