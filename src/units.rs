//! Exact base-unit arithmetic at the chain boundary.
//!
//! Amounts are `U256` base units everywhere gating or contract calls are
//! involved; conversion to a human-readable string happens only at the final
//! render step.

use alloy_primitives::U256;
use thiserror::Error;

/// Decimal places of the wager token.
pub const WAGER_TOKEN_DECIMALS: u8 = 18;

/// Decimal places of the stablecoin.
pub const STABLECOIN_DECIMALS: u8 = 6;

pub const SECONDS_PER_DAY: u64 = 86_400;

pub const MAX_BPS: u16 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("invalid decimal amount: {0:?}")]
    Invalid(String),

    #[error("too many decimal places for a token with {0} decimals")]
    Precision(u8),

    #[error("amount does not fit in 256 bits")]
    Overflow,
}

pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Parses a decimal string such as `"10"` or `"10.5"` into integer base units.
///
/// Rejects fractional digits beyond the token's precision instead of rounding,
/// so the caller never submits an amount the user did not type.
pub fn parse_units(raw: &str, decimals: u8) -> Result<U256, UnitsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Invalid(raw.to_string()));
    }
    let (whole, frac) = match trimmed.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Invalid(raw.to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(UnitsError::Invalid(raw.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::Precision(decimals));
    }

    let whole_units = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| UnitsError::Overflow)?
    };
    let scaled_whole = whole_units
        .checked_mul(pow10(decimals))
        .ok_or(UnitsError::Overflow)?;

    let frac_units = if frac.is_empty() {
        U256::ZERO
    } else {
        let padding = decimals as usize - frac.len();
        let raw_frac =
            U256::from_str_radix(frac, 10).map_err(|_| UnitsError::Overflow)?;
        raw_frac
            .checked_mul(pow10(padding as u8))
            .ok_or(UnitsError::Overflow)?
    };

    scaled_whole.checked_add(frac_units).ok_or(UnitsError::Overflow)
}

/// Formats base units as a decimal string, trimming trailing fraction zeros.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let scale = pow10(decimals);
    let whole = amount / scale;
    let frac = amount % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let digits = frac.to_string();
    let mut frac_str = "0".repeat(decimals as usize - digits.len());
    frac_str.push_str(&digits);
    format!("{}.{}", whole, frac_str.trim_end_matches('0'))
}

/// `amount * bps / 10000`, saturating rather than wrapping.
pub fn apply_bps(amount: U256, bps: u16) -> U256 {
    amount.saturating_mul(U256::from(bps)) / U256::from(MAX_BPS)
}

/// Slippage-bounded minimum output: `amount * (10000 - bps) / 10000`.
pub fn min_out(amount: U256, slippage_bps: u16) -> U256 {
    let kept = MAX_BPS.saturating_sub(slippage_bps);
    amount.saturating_mul(U256::from(kept)) / U256::from(MAX_BPS)
}

/// Day index used by the daily-bet-limit policy:
/// `floor((now - offset) / 86400)`.
pub fn day_index(now_secs: u64, reset_offset_secs: u64) -> u64 {
    now_secs.saturating_sub(reset_offset_secs) / SECONDS_PER_DAY
}
