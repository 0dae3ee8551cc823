//! Integration test suite for Tally settlement.
//!
//! Replays the reference claim scenarios end to end and checks the pool
//! invariants under randomized histories and commit orders.

pub mod helpers;
