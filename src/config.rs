//! Explicit, dependency-injected configuration.
//!
//! Initialization order is config, then transport, then facade/orchestrator:
//! nothing in the crate reaches for process-wide singletons.

use alloy_primitives::Address;
use std::time::Duration;

/// Public 0x aggregator endpoint for the Base chain.
pub const DEFAULT_QUOTE_URL: &str = "https://base.api.0x.org";

/// How long the client observes after submission before it re-reads state.
pub const DEFAULT_OBSERVATION_DELAY: Duration = Duration::from_secs(2);

/// Per-account cool-down after a user rejects an approval prompt.
pub const APPROVAL_COOLDOWN: Duration = Duration::from_secs(20);

/// Default swap slippage bound: 50 bps = 0.5%.
pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;

/// Contracts the client talks to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContractAddresses {
    /// The wager token (18 decimals).
    pub flip_token: Address,
    /// The stablecoin sold for wager tokens (6 decimals).
    pub usdc_token: Address,
    /// The betting contract; spender of bet approvals.
    pub coinflip: Address,
    /// The swap router; spender of stablecoin approvals.
    pub swapper: Address,
}

/// How much allowance an approval grants.
///
/// Bets approve the exact amount each time; swaps default to an unlimited
/// allowance so repeat purchases skip the approval prompt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApprovalPolicy {
    Exact,
    Unlimited,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub addresses: ContractAddresses,
    pub quote_url: String,
    pub observation_delay: Duration,
    pub approval_cooldown: Duration,
    pub swap_approval_policy: ApprovalPolicy,
    pub default_slippage_bps: u16,
}

impl AppConfig {
    pub fn new(addresses: ContractAddresses) -> Self {
        Self {
            addresses,
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            observation_delay: DEFAULT_OBSERVATION_DELAY,
            approval_cooldown: APPROVAL_COOLDOWN,
            swap_approval_policy: ApprovalPolicy::Unlimited,
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }

    /// Deterministic addresses for the in-process local chain.
    pub fn local() -> Self {
        Self::new(ContractAddresses {
            flip_token: Address::repeat_byte(0xF1),
            usdc_token: Address::repeat_byte(0x5C),
            coinflip: Address::repeat_byte(0xC0),
            swapper: Address::repeat_byte(0x5A),
        })
    }
}
