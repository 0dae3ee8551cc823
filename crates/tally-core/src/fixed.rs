//! Fixed-point helpers for base-unit amounts.
//!
//! Every multiply-then-divide floors the result. Products that do not fit
//! in u128 are evaluated with a 256-bit-or-wider intermediate.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::constants::{DECIMALS, UNIT};
use crate::error::AmountError;
use crate::types::Amount;

/// Computes `floor(a * b / denom)`.
///
/// Returns `None` when `denom` is zero or the quotient does not fit in u128.
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    match a.checked_mul(b) {
        Some(product) => Some(product / denom),
        None => {
            let wide = BigUint::from(a) * BigUint::from(b) / BigUint::from(denom);
            wide.to_u128()
        }
    }
}

/// Parse a decimal token string (e.g. `"109.44"`) into base units.
///
/// At most [`DECIMALS`] fractional digits are accepted; nothing is rounded.
pub fn parse_units(text: &str) -> Result<Amount, AmountError> {
    let text = text.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(AmountError::Invalid(text.to_string()));
    }
    if frac.len() > DECIMALS as usize {
        return Err(AmountError::TooManyDecimals {
            got: frac.len(),
            max: DECIMALS,
        });
    }

    let whole_units: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError::Overflow)?
    };
    let mut frac_units: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| AmountError::Overflow)?
    };
    frac_units *= 10u128.pow(DECIMALS - frac.len() as u32);

    whole_units
        .checked_mul(UNIT)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or(AmountError::Overflow)
}

/// Format base units as a decimal token string with trailing zeros trimmed.
pub fn format_units(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{frac:0width$}", width = DECIMALS as usize);
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Whole tokens to base units. Saturates at `u128::MAX`.
pub fn tokens(whole: u128) -> Amount {
    whole.saturating_mul(UNIT)
}
