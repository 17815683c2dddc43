use alloy_primitives::U256;
use thiserror::Error;

/// Closed failure taxonomy surfaced to callers of the orchestrator.
///
/// User-caused: `NotConnected`, `BelowMinimum`, `InsufficientBalance`,
/// `UserRejected`. Policy-caused: `DailyLimitReached`, `ApprovalThrottled`.
/// Environment-caused: `InsufficientGas`, `ContractReverted`, `NetworkError`,
/// `QuoteUnavailable`. Preflight failures never reach the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlipError {
    #[error("please connect your wallet first")]
    NotConnected,

    #[error("need a minimum of {minimum} base units to place this bet")]
    BelowMinimum { minimum: U256 },

    #[error("daily bet limit reached, come back tomorrow")]
    DailyLimitReached,

    #[error("insufficient balance: need {needed} base units, have {available}")]
    InsufficientBalance { needed: U256, available: U256 },

    #[error("rejected in wallet, try again")]
    UserRejected,

    #[error("not enough gas funds to cover the transaction")]
    InsufficientGas,

    #[error("contract reverted: {0}")]
    ContractReverted(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("approval throttled, try again in ~{retry_in_secs}s")]
    ApprovalThrottled { retry_in_secs: u64 },

    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("another action is still in flight")]
    ActionInFlight,
}

impl FlipError {
    /// True when no transaction was broadcast, so retrying costs nothing.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            FlipError::NotConnected
                | FlipError::BelowMinimum { .. }
                | FlipError::DailyLimitReached
                | FlipError::InsufficientBalance { .. }
                | FlipError::ApprovalThrottled { .. }
                | FlipError::QuoteUnavailable(_)
                | FlipError::ActionInFlight
        )
    }
}

/// Maps raw node/provider error text onto the closed taxonomy.
///
/// Providers disagree on error shapes, so this matches known substrings.
/// Unmatched errors fall back to `ContractReverted` carrying the raw text.
pub fn classify_provider_error(raw: &str) -> FlipError {
    let lowered = raw.to_lowercase();
    if lowered.contains("user rejected")
        || lowered.contains("user denied")
        || lowered.contains("rejected the request")
    {
        return FlipError::UserRejected;
    }
    if lowered.contains("insufficient funds") || lowered.contains("insufficient gas") {
        return FlipError::InsufficientGas;
    }
    if lowered.contains("network")
        || lowered.contains("timeout")
        || lowered.contains("timed out")
        || lowered.contains("connection")
    {
        return FlipError::NetworkError(raw.to_string());
    }
    FlipError::ContractReverted(raw.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::{
        FlipError,
        classify_provider_error,
    };

    #[test]
    fn classify_provider_error__maps_user_rejection() {
        // given
        let raw = "MetaMask Tx Signature: User denied transaction signature.";

        // when
        let classified = classify_provider_error(raw);

        // then
        assert_eq!(classified, FlipError::UserRejected);
    }

    #[test]
    fn classify_provider_error__maps_insufficient_funds_to_gas() {
        // given
        let raw = "err: insufficient funds for gas * price + value";

        // when
        let classified = classify_provider_error(raw);

        // then
        assert_eq!(classified, FlipError::InsufficientGas);
    }

    #[test]
    fn classify_provider_error__maps_connection_trouble_to_network() {
        // given
        let raw = "request failed: connection reset by peer";

        // when
        let classified = classify_provider_error(raw);

        // then
        assert!(matches!(classified, FlipError::NetworkError(_)));
    }

    #[test]
    fn classify_provider_error__falls_back_to_contract_reverted() {
        // given
        let raw = "execution reverted: BetTooLarge()";

        // when
        let classified = classify_provider_error(raw);

        // then
        assert_eq!(
            classified,
            FlipError::ContractReverted(raw.to_string()),
        );
    }
}
