//! # Chain Error Types
//!
//! All errors that can occur while talking to the wallet and the contract.

use thiserror::Error;

use crate::rpc::{ProviderError, TransactionReceipt};

/// Errors that can occur in the chain client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// No wallet provider is injected into the environment.
    #[error("no wallet provider found, install a browser wallet")]
    WalletMissing,

    /// The wallet refused to switch to, or add, the target network.
    #[error("network error: {0}")]
    Network(String),

    /// An operation needs a connected account but no session exists.
    #[error("wallet not connected")]
    NotConnected,

    /// The provider rejected a request. Carried verbatim.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A transaction was mined but reverted.
    #[error("transaction {tx_hash} reverted in block {}", .receipt.block_number)]
    Reverted {
        /// Hash of the reverted transaction.
        tx_hash: String,
        /// Receipt of the mined transaction, as the node reported it.
        receipt: Box<TransactionReceipt>,
    },

    /// A contract return value did not match the ABI.
    #[error("abi decode failed: {0}")]
    Abi(String),

    /// The provider answered with an unexpected JSON shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading or writing the persisted session failed.
    #[error("session store i/o: {0}")]
    Io(String),
}

impl From<alloy_sol_types::Error> for ChainError {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::Abi(err.to_string())
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
