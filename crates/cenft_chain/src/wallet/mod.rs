//! # Wallet Connector
//!
//! Owns the wallet session explicitly: one connector per application, with
//! `connect` / `auto_connect` / `disconnect` as the only ways in and out.
//! Nothing about the session lives in globals.
//!
//! ## Session lifecycle
//!
//! ```text
//!   connect() ──────────────▶ Session ──── disconnect() ───▶ none
//!       ▲                        ▲
//!       │ flag set               │
//!   auto_connect() ── flag unset / no accounts / failure ──▶ none
//! ```
//!
//! The only persisted state is a boolean "previously connected" flag that
//! gates silent reconnects.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use alloy_primitives::Address;
use cenft_shared::{UNRECOGNIZED_CHAIN_CODE, WALLET_CONNECTED_KEY};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::ContractClient;
use crate::config::ChainConfig;
use crate::error::{ChainError, ChainResult};
use crate::rpc::{parse_address, parse_quantity, WalletProvider};

// =============================================================================
// SESSION PERSISTENCE
// =============================================================================

/// Client-side storage for the "wallet previously connected" flag.
pub trait SessionStore {
    /// Whether a wallet was connected in a previous session.
    fn was_connected(&self) -> bool;

    /// Sets (`true`) or removes (`false`) the flag.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Io`] if the flag cannot be written.
    fn set_connected(&self, connected: bool) -> ChainResult<()>;
}

/// In-memory flag, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    connected: AtomicBool,
}

impl MemorySessionStore {
    /// Creates a store with the flag preset.
    #[must_use]
    pub const fn with_flag(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn was_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn set_connected(&self, connected: bool) -> ChainResult<()> {
        self.connected.store(connected, Ordering::Relaxed);
        Ok(())
    }
}

/// Flag persisted in a small TOML file under [`WALLET_CONNECTED_KEY`].
///
/// Other keys in the file are preserved. A file that does not parse is
/// never overwritten; writes to it fail with [`ChainError::Io`].
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Uses the file at `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> ChainResult<toml::Table> {
        match std::fs::read_to_string(&self.path) {
            Ok(source) => source
                .parse::<toml::Table>()
                .map_err(|e| ChainError::Io(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn was_connected(&self) -> bool {
        match self.read_table() {
            Ok(table) => table
                .get(WALLET_CONNECTED_KEY)
                .and_then(toml::Value::as_bool)
                .unwrap_or(false),
            Err(e) => {
                warn!("ignoring unreadable session file: {}", e);
                false
            }
        }
    }

    fn set_connected(&self, connected: bool) -> ChainResult<()> {
        let mut table = self.read_table()?;
        if connected {
            table.insert(WALLET_CONNECTED_KEY.to_string(), toml::Value::Boolean(true));
        } else {
            table.remove(WALLET_CONNECTED_KEY);
        }

        let source = toml::to_string(&table).map_err(|e| ChainError::Io(e.to_string()))?;
        std::fs::write(&self.path, source)?;
        Ok(())
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// An established wallet session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    /// Connected account; signs every write.
    pub account: Address,
    /// Chain the wallet reported after switching.
    pub chain_id: u64,
}

/// Negotiates network and account access with the wallet and holds the
/// resulting session.
pub struct WalletConnector<P, S = MemorySessionStore> {
    /// Injected wallet, `None` if the environment has none.
    provider: Option<P>,
    /// Persisted "previously connected" flag.
    store: S,
    /// Target network and contract.
    config: ChainConfig,
    /// Current session.
    session: Option<Session>,
}

fn parse_accounts(value: &Value) -> ChainResult<Vec<Address>> {
    value
        .as_array()
        .ok_or_else(|| ChainError::MalformedResponse(format!("accounts: expected array, got {value}")))?
        .iter()
        .map(parse_address)
        .collect()
}

impl<P: WalletProvider, S: SessionStore> WalletConnector<P, S> {
    /// Creates a disconnected connector.
    ///
    /// # Arguments
    ///
    /// * `provider` - the injected wallet, if any
    /// * `store` - where the reconnect flag lives
    /// * `config` - target network and contract
    #[must_use]
    pub const fn new(provider: Option<P>, store: S, config: ChainConfig) -> Self {
        Self {
            provider,
            store,
            config,
            session: None,
        }
    }

    /// The injected wallet.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::WalletMissing`] if none was injected.
    pub fn provider(&self) -> ChainResult<&P> {
        self.provider.as_ref().ok_or(ChainError::WalletMissing)
    }

    /// Current session, if connected.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether a session is established.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Session flag storage.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Address of the connected account.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NotConnected`] without a session.
    pub fn current_address(&self) -> ChainResult<Address> {
        self.session
            .map(|session| session.account)
            .ok_or(ChainError::NotConnected)
    }

    /// Contract client bound to the current session.
    ///
    /// The client is available while disconnected; its methods then fail
    /// with [`ChainError::NotConnected`].
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::WalletMissing`] if no wallet was injected.
    pub fn contract(&self) -> ChainResult<ContractClient<'_, P>> {
        Ok(ContractClient::new(self.provider()?, self.session, &self.config))
    }

    /// Switches the wallet to the target network (adding it if unknown),
    /// requests account access, and establishes a session.
    ///
    /// # Errors
    ///
    /// - [`ChainError::WalletMissing`] if no wallet was injected
    /// - [`ChainError::Network`] if the switch or add is rejected
    /// - [`ChainError::NotConnected`] if the wallet grants no account
    /// - [`ChainError::Provider`] if account access is refused
    pub async fn connect(&mut self) -> ChainResult<Address> {
        let provider = self.provider()?;
        let network = &self.config.network;

        let switched = provider
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": network.chain_id_hex() }]),
            )
            .await;

        if let Err(switch_err) = switched {
            if switch_err.code != UNRECOGNIZED_CHAIN_CODE {
                return Err(ChainError::Network(format!(
                    "failed to switch to {}: {}",
                    network.chain_name, switch_err.message
                )));
            }

            info!("wallet does not know {}, adding it", network.chain_name);
            provider
                .request("wallet_addEthereumChain", json!([network.add_chain_params()]))
                .await
                .map_err(|e| {
                    ChainError::Network(format!("failed to add {}: {}", network.chain_name, e.message))
                })?;
        }

        let accounts = parse_accounts(&provider.request("eth_requestAccounts", json!([])).await?)?;
        let account = *accounts.first().ok_or(ChainError::NotConnected)?;
        let chain_id = parse_quantity(&provider.request("eth_chainId", json!([])).await?)?;

        self.session = Some(Session { account, chain_id });
        if let Err(e) = self.store.set_connected(true) {
            warn!("could not persist wallet session flag: {}", e);
        }

        info!("wallet connected: {} on chain {}", account, chain_id);
        Ok(account)
    }

    /// Silently restores a previous session.
    ///
    /// Returns `None` (never an error) when there is no wallet, the flag is
    /// unset, no account is already authorized, or reconnecting fails. A
    /// failed attempt clears the flag.
    pub async fn auto_connect(&mut self) -> Option<Address> {
        let provider = self.provider.as_ref()?;

        if !self.store.was_connected() {
            debug!("no previous wallet session, skipping auto-connect");
            return None;
        }

        let accounts = provider
            .request("eth_accounts", json!([]))
            .await
            .map_err(ChainError::from)
            .and_then(|value| parse_accounts(&value));

        let result = match accounts {
            Ok(accounts) if accounts.is_empty() => {
                debug!("wallet has no authorized accounts, skipping auto-connect");
                return None;
            }
            Ok(_) => self.connect().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("auto-connect failed: {}", e);
                self.forget();
                None
            }
        }
    }

    /// Drops the session and clears the persisted flag. No on-chain effect.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            info!("wallet disconnected: {}", session.account);
        }
        self.forget();
    }

    fn forget(&self) {
        if let Err(e) = self.store.set_connected(false) {
            warn!("could not clear wallet session flag: {}", e);
        }
    }
}
