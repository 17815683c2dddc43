//! Transport seam between the client core and the chain RPC layer.
//!
//! Calls are keyed by a target contract address and an ABI method signature
//! string, mirroring how the front-end prepares contract calls. The core
//! treats the transport purely as a carrier and assumes nothing about block
//! time beyond "eventually confirms".

use crate::FlipError;
use alloy_primitives::{
    Address,
    B256,
    Bytes,
    U256,
};

/// ABI method signature strings used by the client.
pub mod methods {
    pub const BALANCE_OF: &str =
        "function balanceOf(address owner) view returns (uint256)";
    pub const ALLOWANCE: &str =
        "function allowance(address owner, address spender) view returns (uint256)";
    pub const MINIMUM_BET: &str = "function minimumBet() view returns (uint256)";
    pub const DAILY_LIMIT_STATE: &str =
        "function getDailyLimitState(address player) view returns (bool, uint256, bool, uint256, uint256)";
    pub const PLATFORM_FEE_INFO: &str =
        "function platformFeeInfo() view returns (address, uint256)";
    pub const PLAYER_STATS: &str =
        "function getPlayerStats(address player) view returns (uint256, uint256, uint256, uint256, uint256, uint256)";
    pub const APPROVE: &str =
        "function approve(address spender, uint256 amount) returns (bool)";
    pub const PLACE_BET: &str =
        "function placeBet(uint256 amount, bool choice) returns (uint256)";
    pub const SWAP_USDC_FOR_FLIP: &str =
        "function swapUSDCForFLIP(uint256 usdcAmount, uint256 minFlipOut, address recipient, address swapTarget, bytes swapCallData) payable returns (uint256)";
    pub const TRANSFER: &str =
        "function transfer(address to, uint256 amount) returns (bool)";
}

/// A single ABI-encoded parameter or return word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Uint(U256),
    Bool(bool),
    Address(Address),
    Bytes(Bytes),
}

impl Value {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(v) => Some(*v),
            _ => None,
        }
    }
}

/// Read-only contract query. Side-effect free and idempotent.
#[derive(Clone, Debug)]
pub struct ContractRead {
    pub contract: Address,
    pub method: &'static str,
    pub params: Vec<Value>,
}

/// State-changing contract call handed to the wallet for signing.
#[derive(Clone, Debug)]
pub struct ContractCall {
    pub contract: Address,
    pub method: &'static str,
    pub params: Vec<Value>,
    pub value: U256,
}

impl ContractCall {
    pub fn new(contract: Address, method: &'static str, params: Vec<Value>) -> Self {
        Self {
            contract,
            method,
            params,
            value: U256::ZERO,
        }
    }
}

/// Receipt for a transaction accepted by the network.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SentTransaction {
    pub tx_hash: B256,
}

/// Read primitives over the chain RPC.
///
/// A failed read means "unknown", never "zero"; callers that gate on a value
/// must propagate the error instead of substituting a default.
pub trait ChainTransport {
    async fn read(&self, read: ContractRead) -> Result<Vec<Value>, FlipError>;
}

/// The wallet connection capability the browser provides.
///
/// The core only consumes this; key material never enters the client.
pub trait WalletProvider {
    fn active_account(&self) -> Option<Address>;

    async fn sign_and_send(
        &self,
        call: ContractCall,
    ) -> Result<SentTransaction, FlipError>;
}
