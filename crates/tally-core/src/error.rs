//! Error types for reward settlement.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeightError {
    #[error("checkpoints not strictly increasing at height {height}")] UnorderedCheckpoints { height: u64 },
    #[error("invalid range: target {target} precedes start {since}")] InvalidRange { since: u64, target: u64 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: u128, need: u128 },
    #[error("zero deposit")] ZeroDeposit,
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("checkpoint height {height} precedes last checkpoint {last}")] NonMonotonicHeight { height: u64, last: u64 },
    #[error("height {height} precedes genesis {genesis}")] BeforeGenesis { height: u64, genesis: u64 },
    #[error("insufficient balance for {holder}: have {have}, need {need}")] InsufficientBalance { holder: String, have: u128, need: u128 },
    #[error("balance overflow")] BalanceOverflow,
    #[error("unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer rejected: {0}")] Rejected(String),
    #[error(transparent)] Ledger(#[from] LedgerError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("nothing to claim")] NothingToClaim,
    #[error("insufficient pool funds: have {have}, need {need}")] InsufficientFunds { have: u128, need: u128 },
    #[error("transfer failed: {0}")] TransferFailed(#[source] TransferError),
    #[error("invalid height {height}: {reason}")] InvalidHeight { height: u64, reason: String },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("weight: {0}")] Weight(#[from] WeightError),
    #[error("ledger: {0}")] Ledger(#[from] LedgerError),
}

impl From<PoolError> for ClaimError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::InsufficientFunds { have, need } => Self::InsufficientFunds { have, need },
            PoolError::ZeroDeposit => Self::NothingToClaim,
            PoolError::ArithmeticOverflow => Self::ArithmeticOverflow,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount: {0:?}")] Invalid(String),
    #[error("too many decimals: {got} > {max}")] TooManyDecimals { got: usize, max: u32 },
    #[error("amount overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue full: {capacity} claims already pending")] Full { capacity: usize },
    #[error("settlement service stopped")] Stopped,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")] InvalidValue { key: String, value: String },
    #[error("{0} must be non-zero")] Zero(&'static str),
}

#[derive(Error, Debug)]
pub enum TallyError {
    #[error(transparent)] Weight(#[from] WeightError),
    #[error(transparent)] Pool(#[from] PoolError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Transfer(#[from] TransferError),
    #[error(transparent)] Claim(#[from] ClaimError),
    #[error(transparent)] Queue(#[from] QueueError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Amount(#[from] AmountError),
}

impl ClaimError {
    /// Whether the claim may succeed if resubmitted at a later height.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NothingToClaim | Self::InsufficientFunds { .. })
    }
}
