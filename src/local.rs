//! In-process chain: a deterministic implementation of the transport and
//! wallet seams backed by plain maps.
//!
//! Executes the same contract surface the client calls on a real network
//! (approve, placeBet, swapUSDCForFLIP, transfer) with explicit knobs for
//! time, randomness, and injected failures.

use crate::{
    FlipError,
    chain::{
        ChainTransport,
        ContractCall,
        ContractRead,
        SentTransaction,
        Value,
        WalletProvider,
        methods,
    },
    config::ContractAddresses,
    types::PlayerStats,
    units::{
        apply_bps,
        day_index,
    },
};
use alloy_primitives::{
    Address,
    B256,
    U256,
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
    },
};
use tracing::debug;

#[derive(Debug)]
struct LocalState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    minimum_bet: U256,
    fee_recipient: Address,
    fee_bps: u16,
    daily_limit_enabled: bool,
    reset_offset_secs: u64,
    last_bet_day: HashMap<Address, u64>,
    stats: HashMap<Address, PlayerStats>,
    active_account: Option<Address>,
    now_secs: u64,
    nonce: u64,
    rng: StdRng,
    rigged_flips: Vec<bool>,
    failing_reads: HashSet<&'static str>,
    next_send_error: Option<FlipError>,
}

/// Cheaply cloneable handle; clones share the same underlying state, so one
/// handle can drive the client while another inspects balances.
#[derive(Clone)]
pub struct LocalChain {
    addresses: ContractAddresses,
    state: Arc<Mutex<LocalState>>,
}

impl LocalChain {
    pub fn new(addresses: ContractAddresses) -> Self {
        Self {
            addresses,
            state: Arc::new(Mutex::new(LocalState {
                balances: HashMap::new(),
                allowances: HashMap::new(),
                minimum_bet: crate::reads::default_minimum_bet(),
                fee_recipient: Address::ZERO,
                fee_bps: 0,
                daily_limit_enabled: false,
                reset_offset_secs: 0,
                last_bet_day: HashMap::new(),
                stats: HashMap::new(),
                active_account: None,
                now_secs: 0,
                nonce: 0,
                rng: StdRng::seed_from_u64(0xF11),
                rigged_flips: Vec::new(),
                failing_reads: HashSet::new(),
                next_send_error: None,
            })),
        }
    }

    pub fn addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LocalState> {
        self.state.lock().expect("local chain state poisoned")
    }

    pub fn connect(&self, account: Address) {
        self.lock().active_account = Some(account);
    }

    pub fn disconnect(&self) {
        self.lock().active_account = None;
    }

    pub fn fund(&self, token: Address, holder: Address, amount: U256) {
        let mut state = self.lock();
        let entry = state.balances.entry((token, holder)).or_default();
        *entry = entry.saturating_add(amount);
    }

    pub fn balance(&self, token: Address, holder: Address) -> U256 {
        self.lock()
            .balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.lock()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_minimum_bet(&self, minimum: U256) {
        self.lock().minimum_bet = minimum;
    }

    pub fn set_fee(&self, recipient: Address, fee_bps: u16) {
        let mut state = self.lock();
        state.fee_recipient = recipient;
        state.fee_bps = fee_bps;
    }

    pub fn enable_daily_limit(&self, reset_offset_secs: u64) {
        let mut state = self.lock();
        state.daily_limit_enabled = true;
        state.reset_offset_secs = reset_offset_secs;
    }

    pub fn set_now_secs(&self, now_secs: u64) {
        self.lock().now_secs = now_secs;
    }

    pub fn advance_time(&self, secs: u64) {
        let mut state = self.lock();
        state.now_secs = state.now_secs.saturating_add(secs);
    }

    /// Forces the outcome of the next coin flip instead of drawing from the
    /// seeded generator. Queued outcomes are consumed oldest first.
    pub fn rig_next_flip(&self, player_wins: bool) {
        self.lock().rigged_flips.push(player_wins);
    }

    /// Makes every read of the given ABI method fail until cleared.
    pub fn fail_reads_for(&self, method: &'static str) {
        self.lock().failing_reads.insert(method);
    }

    pub fn clear_read_failures(&self) {
        self.lock().failing_reads.clear();
    }

    /// Makes the next signed transaction fail with the given error.
    pub fn fail_next_send(&self, error: FlipError) {
        self.lock().next_send_error = Some(error);
    }

    pub fn player_stats(&self, player: Address) -> PlayerStats {
        self.lock().stats.get(&player).copied().unwrap_or_default()
    }
}

impl ChainTransport for LocalChain {
    async fn read(&self, read: ContractRead) -> Result<Vec<Value>, FlipError> {
        let state = self.lock();
        if state.failing_reads.contains(read.method) {
            return Err(FlipError::NetworkError("injected read failure".to_string()));
        }
        match read.method {
            methods::BALANCE_OF => {
                let holder = param_address(&read.params, 0)?;
                let balance = state
                    .balances
                    .get(&(read.contract, holder))
                    .copied()
                    .unwrap_or_default();
                Ok(vec![Value::Uint(balance)])
            }
            methods::ALLOWANCE => {
                let owner = param_address(&read.params, 0)?;
                let spender = param_address(&read.params, 1)?;
                let allowance = state
                    .allowances
                    .get(&(read.contract, owner, spender))
                    .copied()
                    .unwrap_or_default();
                Ok(vec![Value::Uint(allowance)])
            }
            methods::MINIMUM_BET => Ok(vec![Value::Uint(state.minimum_bet)]),
            methods::DAILY_LIMIT_STATE => {
                let player = param_address(&read.params, 0)?;
                let current = day_index(state.now_secs, state.reset_offset_secs);
                // A never-bet account reports hasBet = false; 0 is a real
                // day index and cannot double as the sentinel.
                let last = state.last_bet_day.get(&player).copied();
                Ok(vec![
                    Value::Bool(state.daily_limit_enabled),
                    Value::Uint(U256::from(current)),
                    Value::Bool(last.is_some()),
                    Value::Uint(U256::from(last.unwrap_or_default())),
                    Value::Uint(U256::from(state.reset_offset_secs)),
                ])
            }
            methods::PLATFORM_FEE_INFO => Ok(vec![
                Value::Address(state.fee_recipient),
                Value::Uint(U256::from(state.fee_bps)),
            ]),
            methods::PLAYER_STATS => {
                let player = param_address(&read.params, 0)?;
                let stats = state.stats.get(&player).copied().unwrap_or_default();
                Ok(vec![
                    Value::Uint(U256::from(stats.wins)),
                    Value::Uint(U256::from(stats.losses)),
                    Value::Uint(U256::from(stats.total)),
                    Value::Uint(stats.wagered),
                    Value::Uint(stats.won),
                    Value::Uint(U256::from(stats.active_bets)),
                ])
            }
            other => Err(FlipError::NetworkError(format!(
                "unknown read method {other:?}"
            ))),
        }
    }
}

impl WalletProvider for LocalChain {
    fn active_account(&self) -> Option<Address> {
        self.lock().active_account
    }

    async fn sign_and_send(
        &self,
        call: ContractCall,
    ) -> Result<SentTransaction, FlipError> {
        let mut state = self.lock();
        if let Some(error) = state.next_send_error.take() {
            return Err(error);
        }
        let sender = state.active_account.ok_or(FlipError::NotConnected)?;
        state.nonce += 1;
        let tx_hash = hash_call(state.nonce, call.method);
        debug!(method = call.method, %tx_hash, "local chain executing call");

        match call.method {
            methods::APPROVE => {
                let spender = param_address(&call.params, 0)?;
                let amount = param_uint(&call.params, 1)?;
                state
                    .allowances
                    .insert((call.contract, sender, spender), amount);
            }
            methods::PLACE_BET => {
                let amount = param_uint(&call.params, 0)?;
                execute_bet(&mut state, &self.addresses, sender, amount)?;
            }
            methods::SWAP_USDC_FOR_FLIP => {
                let sell_amount = param_uint(&call.params, 0)?;
                let min_flip_out = param_uint(&call.params, 1)?;
                let recipient = param_address(&call.params, 2)?;
                execute_swap(
                    &mut state,
                    &self.addresses,
                    sender,
                    sell_amount,
                    min_flip_out,
                    recipient,
                )?;
            }
            methods::TRANSFER => {
                let to = param_address(&call.params, 0)?;
                let amount = param_uint(&call.params, 1)?;
                debit(&mut state, call.contract, sender, amount)?;
                credit(&mut state, call.contract, to, amount);
            }
            other => {
                return Err(FlipError::ContractReverted(format!(
                    "unknown method {other:?}"
                )));
            }
        }

        Ok(SentTransaction { tx_hash })
    }
}

fn execute_bet(
    state: &mut LocalState,
    addresses: &ContractAddresses,
    player: Address,
    amount: U256,
) -> Result<(), FlipError> {
    if amount < state.minimum_bet {
        return Err(FlipError::ContractReverted("BetBelowMinimum".to_string()));
    }
    let current_day = day_index(state.now_secs, state.reset_offset_secs);
    if state.daily_limit_enabled
        && state
            .last_bet_day
            .get(&player)
            .is_some_and(|last| *last >= current_day)
    {
        return Err(FlipError::ContractReverted("DailyLimitReached".to_string()));
    }
    let allowance = state
        .allowances
        .get(&(addresses.flip_token, player, addresses.coinflip))
        .copied()
        .unwrap_or_default();
    if allowance < amount {
        return Err(FlipError::ContractReverted(
            "InsufficientAllowance".to_string(),
        ));
    }
    debit(state, addresses.flip_token, player, amount)?;
    state
        .allowances
        .insert((addresses.flip_token, player, addresses.coinflip), allowance - amount);

    let won = if state.rigged_flips.is_empty() {
        state.rng.random::<bool>()
    } else {
        state.rigged_flips.remove(0)
    };

    let stats = state.stats.entry(player).or_default();
    stats.total += 1;
    stats.wagered = stats.wagered.saturating_add(amount);
    if won {
        let gross = amount.saturating_mul(U256::from(2u64));
        let fee = apply_bps(gross, state.fee_bps);
        let payout = gross - fee;
        stats.wins += 1;
        stats.won = stats.won.saturating_add(payout);
        let fee_recipient = state.fee_recipient;
        credit(state, addresses.flip_token, player, payout);
        if !fee.is_zero() {
            credit(state, addresses.flip_token, fee_recipient, fee);
        }
    } else {
        stats.losses += 1;
    }
    state.last_bet_day.insert(player, current_day);
    Ok(())
}

fn execute_swap(
    state: &mut LocalState,
    addresses: &ContractAddresses,
    sender: Address,
    sell_amount: U256,
    min_flip_out: U256,
    recipient: Address,
) -> Result<(), FlipError> {
    let allowance = state
        .allowances
        .get(&(addresses.usdc_token, sender, addresses.swapper))
        .copied()
        .unwrap_or_default();
    if allowance < sell_amount {
        return Err(FlipError::ContractReverted(
            "InsufficientAllowance".to_string(),
        ));
    }
    debit(state, addresses.usdc_token, sender, sell_amount)?;
    if allowance != U256::MAX {
        state.allowances.insert(
            (addresses.usdc_token, sender, addresses.swapper),
            allowance - sell_amount,
        );
    }
    // Local fills land exactly at the slippage bound.
    credit(state, addresses.flip_token, recipient, min_flip_out);
    Ok(())
}

fn debit(
    state: &mut LocalState,
    token: Address,
    holder: Address,
    amount: U256,
) -> Result<(), FlipError> {
    let balance = state
        .balances
        .get(&(token, holder))
        .copied()
        .unwrap_or_default();
    if balance < amount {
        return Err(FlipError::ContractReverted(
            "TransferExceedsBalance".to_string(),
        ));
    }
    state.balances.insert((token, holder), balance - amount);
    Ok(())
}

fn credit(state: &mut LocalState, token: Address, holder: Address, amount: U256) {
    let entry = state.balances.entry((token, holder)).or_default();
    *entry = entry.saturating_add(amount);
}

fn hash_call(nonce: u64, method: &str) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_be_bytes());
    hasher.update(method.as_bytes());
    B256::from_slice(&hasher.finalize())
}

fn param_address(params: &[Value], idx: usize) -> Result<Address, FlipError> {
    params
        .get(idx)
        .and_then(Value::as_address)
        .ok_or_else(|| FlipError::ContractReverted(format!("bad param {idx}")))
}

fn param_uint(params: &[Value], idx: usize) -> Result<U256, FlipError> {
    params
        .get(idx)
        .and_then(Value::as_uint)
        .ok_or_else(|| FlipError::ContractReverted(format!("bad param {idx}")))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::config::AppConfig;

    fn chain() -> (LocalChain, ContractAddresses, Address) {
        let config = AppConfig::local();
        let chain = LocalChain::new(config.addresses);
        let player = Address::repeat_byte(0xAA);
        chain.connect(player);
        (chain, config.addresses, player)
    }

    #[tokio::test]
    async fn place_bet__rejects_without_allowance() {
        // given
        let (chain, addresses, player) = chain();
        chain.fund(addresses.flip_token, player, U256::from(10_000u64) * crate::units::pow10(18));

        // when
        let result = chain
            .sign_and_send(ContractCall::new(
                addresses.coinflip,
                methods::PLACE_BET,
                vec![
                    Value::Uint(U256::from(2_000u64) * crate::units::pow10(18)),
                    Value::Bool(true),
                ],
            ))
            .await;

        // then
        assert!(matches!(result, Err(FlipError::ContractReverted(_))));
    }

    #[tokio::test]
    async fn place_bet__rigged_win_pays_double_minus_fee() {
        // given
        let (chain, addresses, player) = chain();
        let stake = U256::from(2_000u64) * crate::units::pow10(18);
        chain.fund(addresses.flip_token, player, stake);
        chain.set_fee(Address::repeat_byte(0xFE), 350);
        chain.rig_next_flip(true);
        chain
            .sign_and_send(ContractCall::new(
                addresses.flip_token,
                methods::APPROVE,
                vec![Value::Address(addresses.coinflip), Value::Uint(stake)],
            ))
            .await
            .unwrap();

        // when
        chain
            .sign_and_send(ContractCall::new(
                addresses.coinflip,
                methods::PLACE_BET,
                vec![Value::Uint(stake), Value::Bool(true)],
            ))
            .await
            .unwrap();

        // then: 2x payout minus 3.5% fee
        let gross = stake * U256::from(2u64);
        let fee = apply_bps(gross, 350);
        assert_eq!(chain.balance(addresses.flip_token, player), gross - fee);
        assert_eq!(chain.player_stats(player).wins, 1);
    }

    #[tokio::test]
    async fn swap__unlimited_allowance_is_not_consumed() {
        // given
        let (chain, addresses, player) = chain();
        let sell = U256::from(500_000_000u64);
        chain.fund(addresses.usdc_token, player, sell);
        chain
            .sign_and_send(ContractCall::new(
                addresses.usdc_token,
                methods::APPROVE,
                vec![Value::Address(addresses.swapper), Value::Uint(U256::MAX)],
            ))
            .await
            .unwrap();

        // when
        chain
            .sign_and_send(ContractCall::new(
                addresses.swapper,
                methods::SWAP_USDC_FOR_FLIP,
                vec![
                    Value::Uint(sell),
                    Value::Uint(U256::from(1u64)),
                    Value::Address(player),
                    Value::Address(Address::ZERO),
                    Value::Bytes(alloy_primitives::Bytes::new()),
                ],
            ))
            .await
            .unwrap();

        // then
        assert_eq!(
            chain.allowance(addresses.usdc_token, player, addresses.swapper),
            U256::MAX,
        );
        assert_eq!(chain.balance(addresses.usdc_token, player), U256::ZERO);
    }

    #[tokio::test]
    async fn daily_limit__fresh_account_bets_on_day_zero() {
        // given: the clock stays at the epoch, so current day index is 0
        let (chain, addresses, player) = chain();
        let stake = U256::from(2_000u64) * crate::units::pow10(18);
        chain.fund(addresses.flip_token, player, stake);
        chain.enable_daily_limit(0);
        chain
            .sign_and_send(ContractCall::new(
                addresses.flip_token,
                methods::APPROVE,
                vec![Value::Address(addresses.coinflip), Value::Uint(stake)],
            ))
            .await
            .unwrap();

        // when
        let first = chain
            .sign_and_send(ContractCall::new(
                addresses.coinflip,
                methods::PLACE_BET,
                vec![Value::Uint(stake), Value::Bool(true)],
            ))
            .await;

        // then
        assert!(first.is_ok());
    }

    #[tokio::test]
    async fn daily_limit__second_bet_same_day_reverts() {
        // given
        let (chain, addresses, player) = chain();
        let stake = U256::from(2_000u64) * crate::units::pow10(18);
        chain.fund(addresses.flip_token, player, stake * U256::from(10u64));
        chain.enable_daily_limit(0);
        chain.set_now_secs(crate::units::SECONDS_PER_DAY * 5);
        chain
            .sign_and_send(ContractCall::new(
                addresses.flip_token,
                methods::APPROVE,
                vec![
                    Value::Address(addresses.coinflip),
                    Value::Uint(stake * U256::from(2u64)),
                ],
            ))
            .await
            .unwrap();
        let bet = || {
            ContractCall::new(
                addresses.coinflip,
                methods::PLACE_BET,
                vec![Value::Uint(stake), Value::Bool(false)],
            )
        };
        chain.sign_and_send(bet()).await.unwrap();

        // when
        let second = chain.sign_and_send(bet()).await;

        // then
        assert!(matches!(second, Err(FlipError::ContractReverted(_))));

        // and: next day is allowed again
        chain.advance_time(crate::units::SECONDS_PER_DAY);
        chain.sign_and_send(bet()).await.unwrap();
    }
}
