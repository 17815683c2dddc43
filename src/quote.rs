//! Price-quote aggregator client.
//!
//! A quote failure (non-200 response, malformed payload) is its own error
//! kind: the swap has not started yet, so it must never be reported as a
//! failed transaction.

use crate::units::MAX_BPS;
use alloy_primitives::{
    Address,
    Bytes,
    U256,
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::{
    fmt,
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    #[error("quote request failed: {0}")]
    Http(String),

    #[error("quote endpoint responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid quote payload: {0}")]
    Payload(String),
}

/// Parameters for a sell-side quote.
#[derive(Copy, Clone, Debug)]
pub struct QuoteRequest {
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: U256,
    pub taker: Address,
    pub slippage_bps: u16,
}

/// Executable quote: expected output plus the fill target and calldata the
/// swapper contract forwards verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapQuote {
    pub buy_amount: U256,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

pub trait QuoteApi {
    async fn swap_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, QuoteError>;

    /// Indicative buy amount only, used for UI estimates.
    async fn price(&self, request: &QuoteRequest) -> Result<U256, QuoteError>;
}

/// HTTP client for a 0x-style `/swap/v1/{quote,price}` endpoint.
#[derive(Clone)]
pub struct ZeroExClient {
    base_url: String,
    http: reqwest::Client,
}

impl ZeroExClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, QuoteError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| QuoteError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    async fn fetch(
        &self,
        endpoint: &str,
        request: &QuoteRequest,
    ) -> Result<Vec<u8>, QuoteError> {
        let url = format!("{}/swap/v1/{}", self.base_url, endpoint);
        let res = self
            .http
            .get(url)
            .query(&[
                ("sellToken", request.sell_token.to_string()),
                ("buyToken", request.buy_token.to_string()),
                ("sellAmount", request.sell_amount.to_string()),
                ("takerAddress", request.taker.to_string()),
                ("slippagePercentage", slippage_fraction(request.slippage_bps)),
            ])
            .send()
            .await
            .map_err(|e| QuoteError::Http(e.to_string()))?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| QuoteError::Http(e.to_string()))?;
        if status != StatusCode::OK {
            return Err(QuoteError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}

impl QuoteApi for ZeroExClient {
    async fn swap_quote(&self, request: &QuoteRequest) -> Result<SwapQuote, QuoteError> {
        let bytes = self.fetch("quote", request).await?;
        let dto: QuoteDto = serde_json::from_slice(&bytes)
            .map_err(|e| QuoteError::Payload(e.to_string()))?;
        dto.try_into()
    }

    async fn price(&self, request: &QuoteRequest) -> Result<U256, QuoteError> {
        let bytes = self.fetch("price", request).await?;
        let dto: PriceDto = serde_json::from_slice(&bytes)
            .map_err(|e| QuoteError::Payload(e.to_string()))?;
        parse_uint(&dto.buy_amount, "buyAmount")
    }
}

impl fmt::Display for ZeroExClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

/// Renders bps as the decimal fraction the aggregator expects, without
/// floating point (50 bps becomes "0.0050").
fn slippage_fraction(bps: u16) -> String {
    let bps = bps.min(MAX_BPS);
    format!("{}.{:04}", bps / MAX_BPS, bps % MAX_BPS)
}

#[derive(Deserialize)]
struct QuoteDto {
    #[serde(rename = "buyAmount")]
    buy_amount: String,
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
struct PriceDto {
    #[serde(rename = "buyAmount")]
    buy_amount: String,
}

impl TryFrom<QuoteDto> for SwapQuote {
    type Error = QuoteError;

    fn try_from(dto: QuoteDto) -> Result<Self, QuoteError> {
        let buy_amount = parse_uint(&dto.buy_amount, "buyAmount")?;
        let to = Address::from_str(&dto.to)
            .map_err(|_| QuoteError::Payload(format!("bad fill target {:?}", dto.to)))?;
        let raw = dto.data.trim_start_matches("0x");
        let data = hex::decode(raw)
            .map(Bytes::from)
            .map_err(|_| QuoteError::Payload("bad calldata hex".to_string()))?;
        let value = match dto.value {
            Some(v) => parse_uint(&v, "value")?,
            None => U256::ZERO,
        };
        Ok(SwapQuote {
            buy_amount,
            to,
            data,
            value,
        })
    }
}

fn parse_uint(raw: &str, field: &str) -> Result<U256, QuoteError> {
    U256::from_str(raw)
        .map_err(|_| QuoteError::Payload(format!("bad {field} value {raw:?}")))
}
