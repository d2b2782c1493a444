//! # Client Configuration
//!
//! Network definition, contract address and discovery tuning, loaded once
//! from TOML. Every table is optional and falls back to the Sepolia
//! defaults.
//!
//! ```toml
//! contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! receipt_poll_interval_ms = 1000
//!
//! [network]
//! chain_id = 11155111
//! chain_name = "Sepolia"
//! rpc_urls = ["https://rpc.sepolia.org"]
//!
//! [scan]
//! floor = 100
//! multiplier = 3
//! ```

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::discovery::ScanConfig;
use crate::error::{ChainError, ChainResult};
use crate::rpc::quantity;

/// Native currency of the target network, as shown by the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeCurrency {
    /// Currency name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal places.
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "Sepolia Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// Network the wallet is asked to switch to (or add).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// EIP-155 chain ID.
    pub chain_id: u64,
    /// Display name.
    pub chain_name: String,
    /// Native currency.
    pub native_currency: NativeCurrency,
    /// RPC endpoints offered to the wallet.
    pub rpc_urls: Vec<String>,
    /// Block explorers offered to the wallet.
    pub block_explorer_urls: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: 11_155_111,
            chain_name: "Sepolia".to_string(),
            native_currency: NativeCurrency::default(),
            rpc_urls: vec!["https://rpc.sepolia.org".to_string()],
            block_explorer_urls: vec!["https://sepolia.etherscan.io".to_string()],
        }
    }
}

impl NetworkConfig {
    /// Chain ID as a JSON-RPC quantity.
    #[must_use]
    pub fn chain_id_hex(&self) -> String {
        quantity(self.chain_id)
    }

    /// Parameter object for `wallet_addEthereumChain`.
    #[must_use]
    pub fn add_chain_params(&self) -> Value {
        json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.block_explorer_urls,
        })
    }
}

/// Top-level client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Target network.
    pub network: NetworkConfig,
    /// Deployed check-in contract.
    pub contract_address: Address,
    /// Brute-force scan tuning.
    pub scan: ScanConfig,
    /// Delay between receipt polls while waiting for inclusion.
    pub receipt_poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            contract_address: Address::ZERO,
            scan: ScanConfig::default(),
            receipt_poll_interval_ms: 1_000,
        }
    }
}

impl ChainConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Config`] if the document is not valid TOML or a
    /// field has the wrong type.
    pub fn from_toml_str(source: &str) -> ChainResult<Self> {
        toml::from_str(source).map_err(|e| ChainError::Config(e.to_string()))
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ChainError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Receipt poll interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sepolia() {
        let config = ChainConfig::default();

        assert_eq!(config.network.chain_id_hex(), "0xaa36a7");
        assert_eq!(config.scan.floor, 100);
        assert_eq!(config.scan.multiplier, 3);
        assert_eq!(config.receipt_poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_toml() {
        let config = ChainConfig::from_toml_str(
            r#"
            contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [network]
            chain_id = 31337
            chain_name = "Anvil"

            [scan]
            floor = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.network.chain_id, 31337);
        assert_eq!(config.network.native_currency.decimals, 18);
        assert_eq!(config.scan.floor, 20);
        assert_eq!(config.scan.multiplier, 3);
        assert_ne!(config.contract_address, Address::ZERO);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ChainConfig::from_toml_str("contract_address = 12"),
            Err(ChainError::Config(_))
        ));
        assert!(matches!(
            ChainConfig::from_file("/nonexistent/cenft.toml"),
            Err(ChainError::Config(_))
        ));
    }

    #[test]
    fn test_add_chain_params() {
        let params = NetworkConfig::default().add_chain_params();

        assert_eq!(params["chainId"], "0xaa36a7");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
        assert_eq!(params["rpcUrls"][0], "https://rpc.sepolia.org");
    }
}
