//! Contract read facade: the single source of truth for read-only chain
//! queries used by the validator, the orchestrator, and the UI layer.
//!
//! Reads are side-effect free and carry no ordering guarantees between each
//! other. The facade keeps a cache of last-read values for rendering; the
//! cache is never consulted for gating decisions.

use crate::{
    FlipError,
    chain::{
        ChainTransport,
        ContractRead,
        Value,
        methods,
    },
    config::ContractAddresses,
    types::{
        DailyLimitState,
        PlatformFeeInfo,
        PlayerStats,
    },
    units::pow10,
};
use alloy_primitives::{
    Address,
    U256,
};
use std::sync::{
    Arc,
    Mutex,
};
use tracing::warn;

/// Fallback minimum bet (1000 tokens in 18-decimal base units) used when the
/// read fails. UI gating only; the contract still enforces the real value.
pub fn default_minimum_bet() -> U256 {
    U256::from(1000u64) * pow10(18)
}

/// Last successfully read values, for display purposes only.
#[derive(Clone, Debug, Default)]
pub struct ReadCache {
    pub flip_balance: Option<U256>,
    pub usdc_balance: Option<U256>,
    pub swap_allowance: Option<U256>,
    pub minimum_bet: Option<U256>,
    pub fee: Option<PlatformFeeInfo>,
    pub stats: Option<PlayerStats>,
}

pub struct ReadFacade<T> {
    transport: T,
    addresses: ContractAddresses,
    cache: Arc<Mutex<ReadCache>>,
}

impl<T: ChainTransport> ReadFacade<T> {
    pub fn new(transport: T, addresses: ContractAddresses) -> Self {
        Self {
            transport,
            addresses,
            cache: Arc::new(Mutex::new(ReadCache::default())),
        }
    }

    pub fn addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    /// Snapshot of the last-read values.
    pub fn cached(&self) -> ReadCache {
        self.cache.lock().expect("read cache poisoned").clone()
    }

    /// Wager-token balance in base units.
    ///
    /// Failure means "unknown", never "zero": callers gating on balance must
    /// propagate the error.
    pub async fn token_balance(&self, holder: Address) -> Result<U256, FlipError> {
        let balance = self
            .balance_of(self.addresses.flip_token, holder)
            .await?;
        self.cache.lock().expect("read cache poisoned").flip_balance = Some(balance);
        Ok(balance)
    }

    /// Stablecoin balance in base units. Same failure semantics as
    /// [`Self::token_balance`].
    pub async fn stablecoin_balance(&self, holder: Address) -> Result<U256, FlipError> {
        let balance = self
            .balance_of(self.addresses.usdc_token, holder)
            .await?;
        self.cache.lock().expect("read cache poisoned").usdc_balance = Some(balance);
        Ok(balance)
    }

    pub async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, FlipError> {
        let values = self
            .transport
            .read(ContractRead {
                contract: token,
                method: methods::ALLOWANCE,
                params: vec![Value::Address(owner), Value::Address(spender)],
            })
            .await?;
        uint_at(&values, 0)
    }

    /// Stablecoin allowance granted to the swap router.
    pub async fn swap_allowance(&self, owner: Address) -> Result<U256, FlipError> {
        let allowance = self
            .allowance(
                self.addresses.usdc_token,
                owner,
                self.addresses.swapper,
            )
            .await?;
        self.cache.lock().expect("read cache poisoned").swap_allowance =
            Some(allowance);
        Ok(allowance)
    }

    /// Minimum bet in base units. Falls back to [`default_minimum_bet`] when
    /// the read fails, since this only gates the UI.
    pub async fn minimum_bet(&self) -> U256 {
        let read = self
            .transport
            .read(ContractRead {
                contract: self.addresses.coinflip,
                method: methods::MINIMUM_BET,
                params: vec![],
            })
            .await
            .and_then(|values| uint_at(&values, 0));
        let minimum = match read {
            Ok(minimum) => minimum,
            Err(error) => {
                warn!(%error, "minimum bet read failed, using default");
                default_minimum_bet()
            }
        };
        self.cache.lock().expect("read cache poisoned").minimum_bet = Some(minimum);
        minimum
    }

    /// Daily-limit state for one account. Read failures fail open
    /// (`enabled = false`); the contract still enforces the real limit.
    pub async fn daily_limit_state(&self, account: Address) -> DailyLimitState {
        let read = self
            .transport
            .read(ContractRead {
                contract: self.addresses.coinflip,
                method: methods::DAILY_LIMIT_STATE,
                params: vec![Value::Address(account)],
            })
            .await;
        match read {
            Ok(values) => {
                let decoded = (
                    values.first().and_then(Value::as_bool),
                    values.get(1).and_then(Value::as_uint),
                    values.get(2).and_then(Value::as_bool),
                    values.get(3).and_then(Value::as_uint),
                    values.get(4).and_then(Value::as_uint),
                );
                match decoded {
                    (Some(enabled), Some(current), Some(has_bet), Some(last), Some(offset)) => {
                        DailyLimitState {
                            enabled,
                            current_day_index: current.saturating_to(),
                            last_bet_day_index: has_bet.then(|| last.saturating_to()),
                            reset_offset_secs: offset.saturating_to(),
                        }
                    }
                    _ => {
                        warn!("malformed daily limit response, failing open");
                        DailyLimitState::default()
                    }
                }
            }
            Err(error) => {
                warn!(%error, "daily limit read failed, failing open");
                DailyLimitState::default()
            }
        }
    }

    /// Platform fee info. Failure defaults to zero bps so the fee line renders
    /// as 0 instead of an error.
    pub async fn platform_fee_info(&self) -> PlatformFeeInfo {
        let read = self
            .transport
            .read(ContractRead {
                contract: self.addresses.coinflip,
                method: methods::PLATFORM_FEE_INFO,
                params: vec![],
            })
            .await;
        let fee = match read {
            Ok(values) => {
                let recipient = values.first().and_then(Value::as_address);
                let bps = values.get(1).and_then(Value::as_uint);
                match (recipient, bps) {
                    (Some(recipient), Some(bps)) => PlatformFeeInfo {
                        recipient,
                        fee_bps: bps.saturating_to::<u64>().min(10_000) as u16,
                    },
                    _ => PlatformFeeInfo::default(),
                }
            }
            Err(error) => {
                warn!(%error, "platform fee read failed, defaulting to 0 bps");
                PlatformFeeInfo::default()
            }
        };
        self.cache.lock().expect("read cache poisoned").fee = Some(fee);
        fee
    }

    /// Lifetime player stats. Failure defaults to all-zero counters.
    pub async fn player_stats(&self, player: Address) -> PlayerStats {
        let read = self
            .transport
            .read(ContractRead {
                contract: self.addresses.coinflip,
                method: methods::PLAYER_STATS,
                params: vec![Value::Address(player)],
            })
            .await;
        let stats = match read {
            Ok(values) => {
                let uint = |idx: usize| values.get(idx).and_then(Value::as_uint);
                match (uint(0), uint(1), uint(2), uint(3), uint(4), uint(5)) {
                    (
                        Some(wins),
                        Some(losses),
                        Some(total),
                        Some(wagered),
                        Some(won),
                        Some(active),
                    ) => PlayerStats {
                        wins: wins.saturating_to(),
                        losses: losses.saturating_to(),
                        total: total.saturating_to(),
                        wagered,
                        won,
                        active_bets: active.saturating_to(),
                    },
                    _ => PlayerStats::default(),
                }
            }
            Err(error) => {
                warn!(%error, "player stats read failed, defaulting to zero");
                PlayerStats::default()
            }
        };
        self.cache.lock().expect("read cache poisoned").stats = Some(stats);
        stats
    }

    async fn balance_of(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<U256, FlipError> {
        let values = self
            .transport
            .read(ContractRead {
                contract: token,
                method: methods::BALANCE_OF,
                params: vec![Value::Address(holder)],
            })
            .await?;
        uint_at(&values, 0)
    }
}

fn uint_at(values: &[Value], idx: usize) -> Result<U256, FlipError> {
    values
        .get(idx)
        .and_then(Value::as_uint)
        .ok_or_else(|| FlipError::NetworkError("malformed read response".to_string()))
}
