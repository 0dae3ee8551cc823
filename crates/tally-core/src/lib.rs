//! # tally-core
//! Foundation types, fixed-point helpers and traits for holder-weighted
//! reward settlement.

pub mod constants;
pub mod error;
pub mod fixed;
pub mod ledger;
pub mod traits;
pub mod types;
