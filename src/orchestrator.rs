//! Transaction orchestrator: drives each user action through a fixed phase
//! sequence and owns the policies around it (single action in flight,
//! approval cool-down, post-submission observation).
//!
//! Phase order is Validating, then Approving when an allowance is needed,
//! then Submitting, AwaitingConfirmation, and finally Settled or Failed.
//! The phase trace of the most recent action is kept for rendering.

use crate::{
    FlipError,
    chain::{
        ChainTransport,
        ContractCall,
        SentTransaction,
        Value,
        WalletProvider,
        methods,
    },
    config::{
        AppConfig,
        ApprovalPolicy,
    },
    ledger::{
        EntryKind,
        LedgerEntry,
        ProgressLedger,
        store::LedgerStore,
    },
    preflight,
    quote::{
        QuoteApi,
        QuoteRequest,
        SwapQuote,
    },
    reads::ReadFacade,
    types::{
        CoinSide,
        PlayerStats,
    },
    units::min_out,
};
use alloy_primitives::{
    Address,
    B256,
    U256,
};
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
    time::{
        SystemTime,
        UNIX_EPOCH,
    },
};
use tracing::{
    info,
    warn,
};

/// Recipient of quest-tracked transfers on the local chain.
pub const QUEST_RECIPIENT: Address = Address::repeat_byte(0x91);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Validating,
    Approving,
    Submitting,
    AwaitingConfirmation,
    Settled,
    Failed,
}

/// What the client could observe about a bet after the observation delay.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BetResolution {
    Won,
    Lost,
    /// The stats read did not reflect the bet in time. The bet itself was
    /// accepted; only the outcome display is unknown.
    Unknown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BetOutcome {
    pub tx_hash: B256,
    pub resolution: BetResolution,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapOutcome {
    pub tx_hash: B256,
    /// Wager-token base units guaranteed by the slippage bound.
    pub bought: U256,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransferOutcome {
    pub tx_hash: B256,
}

/// Stablecoin figures the swap form renders.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StablecoinStatus {
    pub balance: U256,
    pub allowance: U256,
}

/// Per-account throttle on approval prompts after a rejection, so a user who
/// just dismissed the wallet popup is not immediately re-prompted.
pub struct ApprovalCooldowns {
    cooldown_secs: u64,
    last_rejection: Mutex<HashMap<Address, u64>>,
}

impl ApprovalCooldowns {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown_secs,
            last_rejection: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, account: Address, now_secs: u64) {
        self.last_rejection
            .lock()
            .expect("cooldown map poisoned")
            .insert(account, now_secs);
    }

    /// Remaining cool-down in seconds, or `None` when an approval may run.
    pub fn remaining(&self, account: Address, now_secs: u64) -> Option<u64> {
        let map = self.last_rejection.lock().expect("cooldown map poisoned");
        let rejected_at = map.get(&account)?;
        let elapsed = now_secs.saturating_sub(*rejected_at);
        if elapsed < self.cooldown_secs {
            Some(self.cooldown_secs - elapsed)
        } else {
            None
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct Orchestrator<T, W, Q, S> {
    facade: ReadFacade<T>,
    wallet: W,
    quotes: Q,
    ledger: ProgressLedger<S>,
    config: AppConfig,
    cooldowns: ApprovalCooldowns,
    in_flight: Arc<AtomicBool>,
    trace: Arc<Mutex<Vec<Phase>>>,
}

impl<T, W, Q, S> Orchestrator<T, W, Q, S>
where
    T: ChainTransport,
    W: WalletProvider,
    Q: QuoteApi,
    S: LedgerStore,
{
    pub fn new(
        facade: ReadFacade<T>,
        wallet: W,
        quotes: Q,
        ledger: ProgressLedger<S>,
        config: AppConfig,
    ) -> Self {
        let cooldowns = ApprovalCooldowns::new(config.approval_cooldown.as_secs());
        Self {
            facade,
            wallet,
            quotes,
            ledger,
            config,
            cooldowns,
            in_flight: Arc::new(AtomicBool::new(false)),
            trace: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn facade(&self) -> &ReadFacade<T> {
        &self.facade
    }

    pub fn ledger(&self) -> &ProgressLedger<S> {
        &self.ledger
    }

    pub fn active_account(&self) -> Option<Address> {
        self.wallet.active_account()
    }

    /// Phase trace of the most recent action, oldest first.
    pub fn last_phases(&self) -> Vec<Phase> {
        self.trace.lock().expect("trace poisoned").clone()
    }

    /// Places a bet end to end: validate, approve the exact stake, submit,
    /// then observe the outcome after the configured delay.
    pub async fn place_bet(
        &self,
        side: CoinSide,
        amount: U256,
    ) -> Result<BetOutcome, FlipError> {
        let _guard = self.begin()?;

        self.phase(Phase::Validating);
        let intent = preflight::validate_bet(
            &self.facade,
            self.wallet.active_account(),
            side,
            amount,
        )
        .await
        .map_err(|e| self.fail(e))?;

        // Bets always approve the exact stake; no standing allowance is left
        // on the betting contract.
        self.approve(
            intent.user,
            self.config.addresses.flip_token,
            self.config.addresses.coinflip,
            intent.amount,
        )
        .await?;

        let before = self.facade.player_stats(intent.user).await;

        self.phase(Phase::Submitting);
        let sent = self
            .send(ContractCall::new(
                self.config.addresses.coinflip,
                methods::PLACE_BET,
                vec![
                    Value::Uint(intent.amount),
                    Value::Bool(intent.side.as_bool()),
                ],
            ))
            .await?;
        info!(tx_hash = %sent.tx_hash, side = %intent.side, "bet submitted");

        self.phase(Phase::AwaitingConfirmation);
        tokio::time::sleep(self.config.observation_delay).await;

        // Refresh the balance alongside the stats so the rendered figure
        // reflects the settled bet, not the pre-bet read from validation.
        let (balance, after) = futures::join!(
            self.facade.token_balance(intent.user),
            self.facade.player_stats(intent.user),
        );
        if let Err(error) = balance {
            warn!(%error, "post-bet balance refresh failed");
        }
        let resolution = infer_resolution(&before, &after);

        self.phase(Phase::Settled);
        self.record(LedgerEntry {
            timestamp: Utc::now(),
            kind: EntryKind::Bet {
                won: match resolution {
                    BetResolution::Won => Some(true),
                    BetResolution::Lost => Some(false),
                    BetResolution::Unknown => None,
                },
            },
            amount: intent.amount,
            tx_hash: sent.tx_hash,
            counterparty: self.config.addresses.coinflip,
        });

        Ok(BetOutcome {
            tx_hash: sent.tx_hash,
            resolution,
        })
    }

    /// Swaps stablecoin for wager tokens via an aggregator quote. Skips the
    /// approval phase entirely when the standing allowance already covers the
    /// sale. Tokens land at `recipient` (the connected account by default);
    /// `slippage_bps` falls back to the configured default.
    pub async fn swap(
        &self,
        sell_amount: U256,
        recipient: Option<Address>,
        slippage_bps: Option<u16>,
    ) -> Result<SwapOutcome, FlipError> {
        let _guard = self.begin()?;
        let slippage_bps = slippage_bps.unwrap_or(self.config.default_slippage_bps);

        self.phase(Phase::Validating);
        let (user, clearance) = preflight::validate_swap(
            &self.facade,
            self.wallet.active_account(),
            sell_amount,
        )
        .await
        .map_err(|e| self.fail(e))?;
        let recipient = recipient.unwrap_or(user);

        let quote = self
            .fetch_quote(user, sell_amount, slippage_bps)
            .await
            .map_err(|e| self.fail(e))?;
        let min_buy = min_out(quote.buy_amount, slippage_bps);

        if clearance.needs_approval {
            let allowance = match self.config.swap_approval_policy {
                ApprovalPolicy::Exact => sell_amount,
                ApprovalPolicy::Unlimited => U256::MAX,
            };
            self.approve(
                user,
                self.config.addresses.usdc_token,
                self.config.addresses.swapper,
                allowance,
            )
            .await?;
        }

        self.phase(Phase::Submitting);
        let mut call = ContractCall::new(
            self.config.addresses.swapper,
            methods::SWAP_USDC_FOR_FLIP,
            vec![
                Value::Uint(sell_amount),
                Value::Uint(min_buy),
                Value::Address(recipient),
                Value::Address(quote.to),
                Value::Bytes(quote.data.clone()),
            ],
        );
        call.value = quote.value;
        let sent = self.send(call).await?;
        info!(tx_hash = %sent.tx_hash, %sell_amount, "swap submitted");

        self.phase(Phase::AwaitingConfirmation);
        tokio::time::sleep(self.config.observation_delay).await;
        if let Err(error) = self.refresh_balances(user).await {
            warn!(%error, "post-swap balance refresh failed");
        }

        self.phase(Phase::Settled);
        self.record(LedgerEntry {
            timestamp: Utc::now(),
            kind: EntryKind::Swap,
            amount: min_buy,
            tx_hash: sent.tx_hash,
            counterparty: self.config.addresses.swapper,
        });

        Ok(SwapOutcome {
            tx_hash: sent.tx_hash,
            bought: min_buy,
        })
    }

    /// Sends a quest-tracked wager-token transfer.
    pub async fn transfer_tokens(
        &self,
        recipient: Option<Address>,
        amount: U256,
    ) -> Result<TransferOutcome, FlipError> {
        let _guard = self.begin()?;
        let recipient = recipient.unwrap_or(QUEST_RECIPIENT);

        self.phase(Phase::Validating);
        let intent = preflight::validate_transfer(
            &self.facade,
            self.wallet.active_account(),
            recipient,
            amount,
        )
        .await
        .map_err(|e| self.fail(e))?;

        self.phase(Phase::Submitting);
        let sent = self
            .send(ContractCall::new(
                self.config.addresses.flip_token,
                methods::TRANSFER,
                vec![
                    Value::Address(intent.recipient),
                    Value::Uint(intent.sell_amount),
                ],
            ))
            .await?;
        info!(tx_hash = %sent.tx_hash, "quest transfer submitted");

        self.phase(Phase::AwaitingConfirmation);
        tokio::time::sleep(self.config.observation_delay).await;

        self.phase(Phase::Settled);
        self.record(LedgerEntry {
            timestamp: Utc::now(),
            kind: EntryKind::Swap,
            amount: intent.sell_amount,
            tx_hash: sent.tx_hash,
            counterparty: intent.recipient,
        });

        Ok(TransferOutcome {
            tx_hash: sent.tx_hash,
        })
    }

    /// Refreshes the stablecoin balance and swap allowance in one go.
    pub async fn refresh_stablecoin_status(&self) -> Result<StablecoinStatus, FlipError> {
        let user = self.wallet.active_account().ok_or(FlipError::NotConnected)?;
        let (balance, allowance) = futures::try_join!(
            self.facade.stablecoin_balance(user),
            self.facade.swap_allowance(user),
        )?;
        Ok(StablecoinStatus { balance, allowance })
    }

    /// Indicative wager-token amount a sale would buy right now.
    pub async fn estimate_buy_amount(&self, sell_amount: U256) -> Result<U256, FlipError> {
        let taker = self.wallet.active_account().unwrap_or(Address::ZERO);
        let request =
            self.quote_request(taker, sell_amount, self.config.default_slippage_bps);
        self.quotes
            .price(&request)
            .await
            .map_err(|e| FlipError::QuoteUnavailable(e.to_string()))
    }

    fn begin(&self) -> Result<InFlightGuard, FlipError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| FlipError::ActionInFlight)?;
        self.trace.lock().expect("trace poisoned").clear();
        Ok(InFlightGuard {
            flag: Arc::clone(&self.in_flight),
        })
    }

    fn phase(&self, phase: Phase) {
        self.trace.lock().expect("trace poisoned").push(phase);
    }

    fn fail(&self, error: FlipError) -> FlipError {
        self.phase(Phase::Failed);
        error
    }

    /// Runs an approval transaction under the rejection cool-down.
    async fn approve(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), FlipError> {
        let now = now_secs();
        if let Some(retry_in_secs) = self.cooldowns.remaining(owner, now) {
            return Err(self.fail(FlipError::ApprovalThrottled { retry_in_secs }));
        }

        self.phase(Phase::Approving);
        let result = self
            .wallet
            .sign_and_send(ContractCall::new(
                token,
                methods::APPROVE,
                vec![Value::Address(spender), Value::Uint(amount)],
            ))
            .await;
        match result {
            Ok(sent) => {
                info!(tx_hash = %sent.tx_hash, %spender, "approval confirmed");
                Ok(())
            }
            Err(FlipError::UserRejected) => {
                self.cooldowns.record(owner, now_secs());
                Err(self.fail(FlipError::UserRejected))
            }
            Err(other) => Err(self.fail(other)),
        }
    }

    async fn send(&self, call: ContractCall) -> Result<SentTransaction, FlipError> {
        self.wallet
            .sign_and_send(call)
            .await
            .map_err(|e| self.fail(e))
    }

    async fn fetch_quote(
        &self,
        taker: Address,
        sell_amount: U256,
        slippage_bps: u16,
    ) -> Result<SwapQuote, FlipError> {
        self.quotes
            .swap_quote(&self.quote_request(taker, sell_amount, slippage_bps))
            .await
            .map_err(|e| FlipError::QuoteUnavailable(e.to_string()))
    }

    fn quote_request(
        &self,
        taker: Address,
        sell_amount: U256,
        slippage_bps: u16,
    ) -> QuoteRequest {
        QuoteRequest {
            sell_token: self.config.addresses.usdc_token,
            buy_token: self.config.addresses.flip_token,
            sell_amount,
            taker,
            slippage_bps,
        }
    }

    async fn refresh_balances(&self, user: Address) -> Result<(), FlipError> {
        futures::try_join!(
            self.facade.token_balance(user),
            self.facade.stablecoin_balance(user),
        )?;
        Ok(())
    }

    /// Ledger writes never fail the action they follow.
    fn record(&self, entry: LedgerEntry) {
        match self.ledger.record(entry) {
            Ok(newly) => {
                for unlock in newly {
                    info!(id = unlock.id, title = unlock.title, "achievement unlocked");
                }
            }
            Err(error) => warn!(%error, "ledger write failed"),
        }
    }
}

fn infer_resolution(before: &PlayerStats, after: &PlayerStats) -> BetResolution {
    if after.total <= before.total {
        return BetResolution::Unknown;
    }
    if after.wins > before.wins {
        BetResolution::Won
    } else {
        BetResolution::Lost
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn cooldowns__block_within_window_and_clear_after() {
        // given
        let cooldowns = ApprovalCooldowns::new(20);
        let account = Address::repeat_byte(0xAA);
        cooldowns.record(account, 100);

        // then
        assert_eq!(cooldowns.remaining(account, 105), Some(15));
        assert_eq!(cooldowns.remaining(account, 120), None);
    }

    #[test]
    fn cooldowns__are_per_account() {
        // given
        let cooldowns = ApprovalCooldowns::new(20);
        cooldowns.record(Address::repeat_byte(0xAA), 100);

        // then
        assert_eq!(cooldowns.remaining(Address::repeat_byte(0xBB), 101), None);
    }

    #[test]
    fn infer_resolution__unchanged_stats_mean_unknown() {
        // given
        let stats = PlayerStats::default();

        // then
        assert_eq!(infer_resolution(&stats, &stats), BetResolution::Unknown);
    }

    #[test]
    fn infer_resolution__win_counter_decides_outcome() {
        // given
        let before = PlayerStats::default();
        let won = PlayerStats {
            total: 1,
            wins: 1,
            ..PlayerStats::default()
        };
        let lost = PlayerStats {
            total: 1,
            losses: 1,
            ..PlayerStats::default()
        };

        // then
        assert_eq!(infer_resolution(&before, &won), BetResolution::Won);
        assert_eq!(infer_resolution(&before, &lost), BetResolution::Lost);
    }
}
