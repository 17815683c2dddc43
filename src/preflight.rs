//! Preflight validation: cheaply reject obviously-invalid actions before any
//! gas is spent.
//!
//! Checks run in a fixed order and short-circuit on the first failure, so
//! connection problems surface before balance problems. Each validation is a
//! bounded number of read calls and never mutates state. The resulting checks
//! are a UI-level gate, not a substitute for the contract's own atomic ones.

use crate::{
    FlipError,
    chain::ChainTransport,
    reads::ReadFacade,
    types::{
        BetIntent,
        CoinSide,
        SwapIntent,
    },
    units::pow10,
};
use alloy_primitives::{
    Address,
    U256,
};

/// Smallest wager-token transfer tracked by the swapping quest
/// (10,000 tokens in base units).
pub fn minimum_quest_transfer() -> U256 {
    U256::from(10_000u64) * pow10(18)
}

/// Outcome of swap validation: whether an approval step must run before the
/// swap transaction itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapClearance {
    pub needs_approval: bool,
}

/// Validates a proposed bet. Check order: connection, minimum, daily limit,
/// balance; the first failing reason is returned.
pub async fn validate_bet<T: ChainTransport>(
    facade: &ReadFacade<T>,
    account: Option<Address>,
    side: CoinSide,
    amount: U256,
) -> Result<BetIntent, FlipError> {
    let user = account.ok_or(FlipError::NotConnected)?;

    let minimum = facade.minimum_bet().await;
    if amount < minimum {
        return Err(FlipError::BelowMinimum { minimum });
    }

    let limit = facade.daily_limit_state(user).await;
    if !limit.bet_allowed() {
        return Err(FlipError::DailyLimitReached);
    }

    let balance = facade.token_balance(user).await?;
    if balance < amount {
        return Err(FlipError::InsufficientBalance {
            needed: amount,
            available: balance,
        });
    }

    Ok(BetIntent { side, amount, user })
}

/// Validates a proposed stablecoin-to-wager-token swap and reports whether an
/// allowance increase is required first.
pub async fn validate_swap<T: ChainTransport>(
    facade: &ReadFacade<T>,
    account: Option<Address>,
    sell_amount: U256,
) -> Result<(Address, SwapClearance), FlipError> {
    let user = account.ok_or(FlipError::NotConnected)?;

    if sell_amount.is_zero() {
        return Err(FlipError::BelowMinimum {
            minimum: U256::from(1u64),
        });
    }

    let balance = facade.stablecoin_balance(user).await?;
    if balance < sell_amount {
        return Err(FlipError::InsufficientBalance {
            needed: sell_amount,
            available: balance,
        });
    }

    let allowance = facade.swap_allowance(user).await?;
    Ok((
        user,
        SwapClearance {
            needs_approval: allowance < sell_amount,
        },
    ))
}

/// Validates a quest-tracked wager-token transfer.
pub async fn validate_transfer<T: ChainTransport>(
    facade: &ReadFacade<T>,
    account: Option<Address>,
    recipient: Address,
    amount: U256,
) -> Result<SwapIntent, FlipError> {
    let user = account.ok_or(FlipError::NotConnected)?;

    let minimum = minimum_quest_transfer();
    if amount < minimum {
        return Err(FlipError::BelowMinimum { minimum });
    }

    let balance = facade.token_balance(user).await?;
    if balance < amount {
        return Err(FlipError::InsufficientBalance {
            needed: amount,
            available: balance,
        });
    }

    Ok(SwapIntent {
        sell_amount: amount,
        min_buy_amount: amount,
        recipient,
    })
}
