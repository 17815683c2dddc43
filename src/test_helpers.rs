//! Shared fixtures for unit and integration tests.

use crate::{
    config::AppConfig,
    ledger::{
        ProgressLedger,
        store::InMemoryLedgerStore,
    },
    local::LocalChain,
    orchestrator::Orchestrator,
    quote::{
        QuoteApi,
        QuoteError,
        QuoteRequest,
        SwapQuote,
    },
    reads::ReadFacade,
    units::pow10,
};
use alloy_primitives::{
    Address,
    Bytes,
    U256,
};
use std::{
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

pub const PLAYER: Address = Address::repeat_byte(0xAA);

/// Wager-token amount in 18-decimal base units.
pub fn tokens(amount: u64) -> U256 {
    U256::from(amount) * pow10(18)
}

/// Stablecoin amount in 6-decimal base units.
pub fn usdc(amount: u64) -> U256 {
    U256::from(amount) * pow10(6)
}

/// Quote stub filling at a fixed wager-tokens-per-stablecoin rate, with a
/// knob to make the endpoint unreachable.
#[derive(Clone)]
pub struct FixedRateQuoteApi {
    flip_per_usdc: u64,
    failing: Arc<Mutex<bool>>,
}

impl FixedRateQuoteApi {
    pub fn new(flip_per_usdc: u64) -> Self {
        Self {
            flip_per_usdc,
            failing: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("quote stub poisoned") = failing;
    }

    fn buy_amount(&self, sell_amount: U256) -> U256 {
        // 6-decimal stablecoin in, 18-decimal wager token out.
        sell_amount * U256::from(self.flip_per_usdc) * pow10(12)
    }

    fn check(&self) -> Result<(), QuoteError> {
        if *self.failing.lock().expect("quote stub poisoned") {
            return Err(QuoteError::Http("injected quote failure".to_string()));
        }
        Ok(())
    }
}

impl QuoteApi for FixedRateQuoteApi {
    async fn swap_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, QuoteError> {
        self.check()?;
        Ok(SwapQuote {
            buy_amount: self.buy_amount(request.sell_amount),
            to: Address::repeat_byte(0x0F),
            data: Bytes::from(vec![0x01]),
            value: U256::ZERO,
        })
    }

    async fn price(&self, request: &QuoteRequest) -> Result<U256, QuoteError> {
        self.check()?;
        Ok(self.buy_amount(request.sell_amount))
    }
}

pub type TestOrchestrator =
    Orchestrator<LocalChain, LocalChain, FixedRateQuoteApi, InMemoryLedgerStore>;

/// Everything a scenario needs: a connected player on an in-process chain,
/// an orchestrator with a zero observation delay, and handles to inspect the
/// chain, quote stub, and ledger afterwards.
pub struct TestContext {
    pub chain: LocalChain,
    pub config: AppConfig,
    pub quotes: FixedRateQuoteApi,
    pub ledger: ProgressLedger<InMemoryLedgerStore>,
    pub orchestrator: TestOrchestrator,
}

impl TestContext {
    pub fn new() -> Self {
        let mut config = AppConfig::local();
        config.observation_delay = Duration::ZERO;
        let chain = LocalChain::new(config.addresses);
        chain.connect(PLAYER);
        let quotes = FixedRateQuoteApi::new(10);
        let ledger = ProgressLedger::load(InMemoryLedgerStore::new())
            .expect("in-memory ledger");
        let facade = ReadFacade::new(chain.clone(), config.addresses);
        let orchestrator = Orchestrator::new(
            facade,
            chain.clone(),
            quotes.clone(),
            ledger.clone(),
            config.clone(),
        );
        Self {
            chain,
            config,
            quotes,
            ledger,
            orchestrator,
        }
    }

    /// Rebuilds the orchestrator after a config change, keeping the chain,
    /// quote stub, and ledger.
    pub fn rebuild(self) -> Self {
        let facade = ReadFacade::new(self.chain.clone(), self.config.addresses);
        let orchestrator = Orchestrator::new(
            facade,
            self.chain.clone(),
            self.quotes.clone(),
            self.ledger.clone(),
            self.config.clone(),
        );
        Self {
            orchestrator,
            ..self
        }
    }

    pub fn fund_flip(&self, amount: U256) {
        self.chain
            .fund(self.config.addresses.flip_token, PLAYER, amount);
    }

    pub fn fund_usdc(&self, amount: U256) {
        self.chain
            .fund(self.config.addresses.usdc_token, PLAYER, amount);
    }

    pub fn flip_balance(&self) -> U256 {
        self.chain.balance(self.config.addresses.flip_token, PLAYER)
    }

    pub fn usdc_balance(&self) -> U256 {
        self.chain.balance(self.config.addresses.usdc_token, PLAYER)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
