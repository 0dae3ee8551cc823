//! Protocol constants. All monetary values are in base units
//! (1 token = 10^18 base units).

/// Decimal places of the reward asset.
pub const DECIMALS: u32 = 18;

/// One whole token in base units.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Denominator of the holder share ratio.
///
/// A holder's share of the pool is `weight * RATIO_PRECISION / total_weight`,
/// floored, so shares are resolved to 1e-7 of the pool.
pub const RATIO_PRECISION: u128 = 10_000_000;

/// Default number of claims a settlement queue accepts per block.
pub const DEFAULT_MAX_BATCH: usize = 1024;
