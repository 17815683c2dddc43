//! Domain value objects shared across the facade, validator, and orchestrator.

use alloy_primitives::{
    Address,
    U256,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// The two coin outcomes a bettor can back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    /// Wire encoding used by the contract's `placeBet(uint256,bool)` call.
    pub fn as_bool(self) -> bool {
        matches!(self, CoinSide::Heads)
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

/// Ephemeral bet request. Created on user intent, consumed by the
/// orchestrator, never persisted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BetIntent {
    pub side: CoinSide,
    pub amount: U256,
    pub user: Address,
}

/// Ephemeral swap request with a slippage-bounded minimum output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapIntent {
    pub sell_amount: U256,
    pub min_buy_amount: U256,
    pub recipient: Address,
}

/// Platform fee configuration as read from the contract.
///
/// 100 bps = 1%. Cached client-side, never mutated locally.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlatformFeeInfo {
    pub recipient: Address,
    pub fee_bps: u16,
}

impl Default for PlatformFeeInfo {
    fn default() -> Self {
        Self {
            recipient: Address::ZERO,
            fee_bps: 0,
        }
    }
}

/// Daily bet-limit state for one account.
///
/// The contract enforces the real limit; this copy only gates the UI, which
/// is why read failures fail open (`enabled = false`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DailyLimitState {
    pub enabled: bool,
    pub current_day_index: u64,
    /// `None` for an account that has never bet, so a fresh account is not
    /// confused with one that bet on day zero.
    pub last_bet_day_index: Option<u64>,
    pub reset_offset_secs: u64,
}

impl DailyLimitState {
    /// A limited bet is allowed only while the account has not yet bet today.
    pub fn bet_allowed(&self) -> bool {
        !self.enabled
            || self
                .last_bet_day_index
                .is_none_or(|last| last < self.current_day_index)
    }
}

/// Lifetime per-player counters kept by the contract.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub wins: u64,
    pub losses: u64,
    pub total: u64,
    pub wagered: U256,
    pub won: U256,
    pub active_bets: u64,
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn bet_allowed__disabled_limit_always_allows() {
        // given
        let state = DailyLimitState {
            enabled: false,
            current_day_index: 10,
            last_bet_day_index: Some(10),
            reset_offset_secs: 0,
        };

        // then
        assert!(state.bet_allowed());
    }

    #[test]
    fn bet_allowed__blocks_second_bet_on_same_day() {
        // given
        let state = DailyLimitState {
            enabled: true,
            current_day_index: 10,
            last_bet_day_index: Some(10),
            reset_offset_secs: 0,
        };

        // then
        assert!(!state.bet_allowed());
    }

    #[test]
    fn bet_allowed__allows_after_day_rollover() {
        // given
        let state = DailyLimitState {
            enabled: true,
            current_day_index: 11,
            last_bet_day_index: Some(10),
            reset_offset_secs: 0,
        };

        // then
        assert!(state.bet_allowed());
    }

    #[test]
    fn bet_allowed__never_bet_account_is_allowed_on_day_zero() {
        // given
        let state = DailyLimitState {
            enabled: true,
            current_day_index: 0,
            last_bet_day_index: None,
            reset_offset_secs: 0,
        };

        // then
        assert!(state.bet_allowed());
    }
}
