//! # tally-weight: Holder-unit weight engine.
//!
//! All calculations use checked integer arithmetic for determinism.
//!
//! A holder's weight is the time-integral of their balance:
//! - **Intervals**: checkpoints partition the block range into spans with a
//!   constant balance ([`interval::intervals`]).
//! - **Units**: each span contributes `balance * blocks`; the weight is the sum.
//! - **Reset**: integration can start at an arbitrary height (the holder's
//!   last claim), so only unclaimed blocks count.
//! - **Normaliser**: the whole supply held since genesis,
//!   `supply * (target - genesis)`.

pub mod engine;
pub mod interval;

pub use engine::WeightEngine;
pub use interval::{intervals, BalanceInterval};
