//! # CENFT Chain Client
//!
//! Wallet session handling, typed access to the event check-in contract,
//! and discovery of the commemorative tokens an account owns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   connect    ┌─────────────────┐
//! │ WalletProvider  │ ◀──────────  │ WalletConnector │ ── Session
//! │ (EIP-1193)      │              └────────┬────────┘
//! └────────▲────────┘                       │ contract()
//!          │ eth_call / eth_sendTransaction ▼
//!          │                       ┌─────────────────┐
//!          └────────────────────── │ ContractClient  │
//!                                  └────────┬────────┘
//!                                           │ TokenReader
//!                                           ▼
//!                                  ┌─────────────────┐
//!                                  │  NftDiscovery   │ ── parse_token_uri
//!                                  └─────────────────┘
//! ```
//!
//! Every request is awaited in turn; nothing runs concurrently.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cenft_chain::{ChainConfig, MemorySessionStore, WalletConnector};
//!
//! let config = ChainConfig::from_file("cenft.toml")?;
//! let mut wallet = WalletConnector::new(Some(provider), MemorySessionStore::default(), config);
//! wallet.connect().await?;
//!
//! for token in wallet.contract()?.get_user_nfts().await? {
//!     println!("#{} {:?}", token.token_id, token.metadata.name());
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod client;
pub mod config;
pub mod contracts;
pub mod discovery;
pub mod error;
pub mod events;
pub mod metadata;
pub mod rpc;
pub mod simulator;
pub mod wallet;

pub use client::ContractClient;
pub use config::{ChainConfig, NativeCurrency, NetworkConfig};
pub use contracts::{EventRecord, ICheckInNFT};
pub use discovery::{LogScanDiscovery, NftDiscovery, OwnedToken, ScanConfig, TokenReader};
pub use error::{ChainError, ChainResult};
pub use events::{CheckInLog, EventParser};
pub use metadata::{parse_token_uri, TokenMetadata};
pub use rpc::{ProviderError, RawLog, TransactionReceipt, WalletProvider};
pub use simulator::ContractSimulator;
pub use wallet::{FileSessionStore, MemorySessionStore, Session, SessionStore, WalletConnector};
