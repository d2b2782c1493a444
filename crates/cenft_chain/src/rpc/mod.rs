//! # Wallet Provider Seam
//!
//! The browser environment supplies an EIP-1193 provider: a single
//! `request(method, params)` entry point speaking JSON-RPC. Everything in
//! this crate reaches the chain through [`WalletProvider`], so the provider
//! can be a browser bridge, an HTTP node, or the in-memory simulator.
//!
//! This module also holds the JSON decoding helpers for the few response
//! shapes the client consumes (quantities, data, logs, receipts).

use std::str::FromStr;

use alloy_primitives::{hex, Address, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{ChainError, ChainResult};

/// EIP-1193 code for a request the user rejected in the wallet.
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC error code used for execution reverts.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Error object returned by the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    /// EIP-1193 / JSON-RPC error code.
    pub code: i64,
    /// Human-readable message from the provider.
    pub message: String,
}

impl ProviderError {
    /// Creates a provider error.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A browser-injected (or otherwise supplied) wallet provider.
///
/// Requests are awaited one at a time; implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait WalletProvider {
    /// Issues one JSON-RPC request and returns its `result` member.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

impl<P: WalletProvider + ?Sized> WalletProvider for &P {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        (**self).request(method, params).await
    }
}

// =============================================================================
// JSON DECODING HELPERS
// =============================================================================

fn as_str<'a>(value: &'a Value, what: &str) -> ChainResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ChainError::MalformedResponse(format!("{what}: expected string, got {value}")))
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

/// Encodes a `u64` as a JSON-RPC quantity (`0x`-prefixed, no leading zeros).
#[must_use]
pub fn quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// Encodes bytes as `0x`-prefixed hex.
#[must_use]
pub fn hex_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decodes a JSON-RPC quantity into a `u64`.
///
/// # Errors
///
/// Returns [`ChainError::MalformedResponse`] for non-string or non-hex input.
pub fn parse_quantity(value: &Value) -> ChainResult<u64> {
    let s = as_str(value, "quantity")?;
    u64::from_str_radix(strip_0x(s), 16)
        .map_err(|e| ChainError::MalformedResponse(format!("quantity {s}: {e}")))
}

/// Decodes a JSON-RPC quantity into a `U256`.
///
/// # Errors
///
/// Returns [`ChainError::MalformedResponse`] for non-string or non-hex input.
pub fn parse_u256(value: &Value) -> ChainResult<U256> {
    let s = as_str(value, "quantity")?;
    U256::from_str_radix(strip_0x(s), 16)
        .map_err(|e| ChainError::MalformedResponse(format!("quantity {s}: {e}")))
}

/// Decodes `0x`-prefixed hex data.
///
/// # Errors
///
/// Returns [`ChainError::MalformedResponse`] for non-string or non-hex input.
pub fn parse_data(value: &Value) -> ChainResult<Vec<u8>> {
    let s = as_str(value, "data")?;
    hex::decode(strip_0x(s)).map_err(|e| ChainError::MalformedResponse(format!("data: {e}")))
}

/// Decodes an address. Checksums are not enforced.
///
/// # Errors
///
/// Returns [`ChainError::MalformedResponse`] for anything but a 20-byte hex string.
pub fn parse_address(value: &Value) -> ChainResult<Address> {
    let s = as_str(value, "address")?;
    Address::from_str(s).map_err(|e| ChainError::MalformedResponse(format!("address {s}: {e}")))
}

/// Decodes a 32-byte word.
///
/// # Errors
///
/// Returns [`ChainError::MalformedResponse`] for anything but a 32-byte hex string.
pub fn parse_b256(value: &Value) -> ChainResult<B256> {
    let s = as_str(value, "word")?;
    B256::from_str(s).map_err(|e| ChainError::MalformedResponse(format!("word {s}: {e}")))
}

/// Left-pads an address into an indexed log topic.
#[must_use]
pub fn address_topic(address: Address) -> B256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    B256::from(word)
}

/// Encodes a `uint256` as an indexed log topic.
#[must_use]
pub fn u256_topic(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

// =============================================================================
// LOGS & RECEIPTS
// =============================================================================

/// A log entry as returned by `eth_getLogs` or inside a receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    /// Non-indexed event data.
    pub data: Vec<u8>,
    /// Block the log was included in, if mined.
    pub block_number: Option<u64>,
    /// Position within the block, if mined.
    pub log_index: Option<u64>,
}

impl RawLog {
    /// Decodes a log object.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::MalformedResponse`] if a required member is missing
    /// or not valid hex.
    pub fn from_json(value: &Value) -> ChainResult<Self> {
        let topics = value["topics"]
            .as_array()
            .ok_or_else(|| ChainError::MalformedResponse("log without topics".to_string()))?
            .iter()
            .map(parse_b256)
            .collect::<ChainResult<Vec<_>>>()?;

        Ok(Self {
            address: parse_address(&value["address"])?,
            topics,
            data: parse_data(&value["data"])?,
            block_number: optional(&value["blockNumber"])?,
            log_index: optional(&value["logIndex"])?,
        })
    }

    /// Encodes this log the way a node reports it.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "address": self.address.to_string(),
            "topics": self.topics.iter().map(|t| hex_data(t.as_slice())).collect::<Vec<_>>(),
            "data": hex_data(&self.data),
            "blockNumber": self.block_number.map(quantity),
            "logIndex": self.log_index.map(quantity),
        })
    }
}

fn optional(value: &Value) -> ChainResult<Option<u64>> {
    if value.is_null() {
        Ok(None)
    } else {
        parse_quantity(value).map(Some)
    }
}

/// Receipt of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub transaction_hash: B256,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// `true` on success, `false` if execution reverted.
    pub status: bool,
    /// Gas consumed.
    pub gas_used: u64,
    /// Logs emitted by the transaction.
    pub logs: Vec<RawLog>,
}

impl TransactionReceipt {
    /// Decodes an `eth_getTransactionReceipt` result.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::MalformedResponse`] if a required member is missing
    /// or not valid hex.
    pub fn from_json(value: &Value) -> ChainResult<Self> {
        let logs = match value["logs"].as_array() {
            Some(logs) => logs.iter().map(RawLog::from_json).collect::<ChainResult<_>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            transaction_hash: parse_b256(&value["transactionHash"])?,
            block_number: parse_quantity(&value["blockNumber"])?,
            status: parse_quantity(&value["status"])? == 1,
            gas_used: optional(&value["gasUsed"])?.unwrap_or_default(),
            logs,
        })
    }

    /// Encodes this receipt the way a node reports it.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "transactionHash": hex_data(self.transaction_hash.as_slice()),
            "blockNumber": quantity(self.block_number),
            "status": quantity(u64::from(self.status)),
            "gasUsed": quantity(self.gas_used),
            "logs": self.logs.iter().map(RawLog::to_json).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quantities() {
        assert_eq!(quantity(0), "0x0");
        assert_eq!(quantity(11_155_111), "0xaa36a7");
        assert_eq!(parse_quantity(&json!("0xaa36a7")).unwrap(), 11_155_111);
        assert_eq!(parse_u256(&json!("0x2a")).unwrap(), U256::from(42));
        assert!(matches!(
            parse_quantity(&json!(12)),
            Err(ChainError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_topics() {
        let address = Address::repeat_byte(0xab);
        let topic = address_topic(address);
        assert_eq!(&topic[..12], &[0u8; 12]);
        assert_eq!(&topic[12..], address.as_slice());

        let topic = u256_topic(U256::from(5));
        assert_eq!(topic[31], 5);
        assert_eq!(U256::from_be_slice(topic.as_slice()), U256::from(5));
    }

    #[test]
    fn test_receipt_from_node_json() {
        let receipt = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x0",
            "gasUsed": "0x5208",
            "logs": [{
                "address": format!("0x{}", "22".repeat(20)),
                "topics": [format!("0x{}", "33".repeat(32))],
                "data": "0x",
                "blockNumber": "0x10",
                "logIndex": "0x0",
            }],
        });

        let parsed = TransactionReceipt::from_json(&receipt).unwrap();
        assert!(!parsed.status);
        assert_eq!(parsed.block_number, 16);
        assert_eq!(parsed.gas_used, 21_000);
        assert_eq!(parsed.logs.len(), 1);
        assert!(parsed.logs[0].data.is_empty());
        assert_eq!(parsed.logs[0].address, Address::repeat_byte(0x22));
    }
}
