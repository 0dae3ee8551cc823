//! Core settlement types: holders, checkpoints, reward records, receipts.
//!
//! All monetary values are in base units (1 token = 10^18 base units).
//! Holder weight is measured in base-unit-blocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token amount in base units.
pub type Amount = u128;

/// Holder units: balance integrated over block height (base units × blocks).
pub type Weight = u128;

/// A 20-byte holder address.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HolderId(pub [u8; 20]);

impl HolderId {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Derive a deterministic address from a human-readable label.
    ///
    /// Takes the first 20 bytes of the BLAKE3 hash of `label`.
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for HolderId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 20]> for HolderId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// A balance change: `balance` is effective from `height` until the next checkpoint.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub height: u64,
    pub balance: Amount,
}

impl Checkpoint {
    pub fn new(height: u64, balance: Amount) -> Self {
        Self { height, balance }
    }
}

/// Per-holder settlement record. Created on first claim, never deleted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct RewardRecord {
    /// Running total ever paid to the holder. Never decreases.
    pub claimed: Amount,
    /// Height of the most recent successful claim. Weight accrues from here.
    pub last_claimed_height: Option<u64>,
    /// Number of successful claims.
    pub claims: u64,
}

/// Outcome of a successful claim.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub holder: HolderId,
    /// Settlement height.
    pub height: u64,
    /// Holder units accrued since the previous claim.
    pub weight: Weight,
    /// Normaliser: total supply × blocks since genesis.
    pub total_weight: Weight,
    /// Holder share in units of `1 / RATIO_PRECISION`.
    pub ratio: u128,
    /// Amount paid by this claim.
    pub payout: Amount,
    /// Cumulative amount paid to the holder, including this claim.
    pub total_claimed: Amount,
    /// Pool funds remaining after this claim.
    pub pool_after: Amount,
}

/// Read-only view of pool accounting.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PoolSnapshot {
    pub funds: Amount,
    pub total_deposited: Amount,
    pub total_paid: Amount,
    /// Number of holders with a reward record.
    pub claimants: usize,
}
