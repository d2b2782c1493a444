//! # Contract Client
//!
//! One typed method per contract entry point. Reads go through `eth_call`,
//! writes through `eth_sendTransaction` followed by a wait for the receipt.
//!
//! There is no retry policy, batching, or gas strategy. A rejected
//! submission or a reverted transaction reaches the caller as-is.

use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;
use serde_json::json;
use tracing::{debug, info};

use crate::config::ChainConfig;
use crate::contracts::{EventRecord, ICheckInNFT};
use crate::discovery::{LogScanDiscovery, NftDiscovery, OwnedToken, ScanConfig, TokenReader};
use crate::error::{ChainError, ChainResult};
use crate::events::{CheckInLog, EventParser};
use crate::rpc::{
    address_topic, hex_data, parse_b256, parse_data, RawLog, TransactionReceipt, WalletProvider,
};
use crate::wallet::Session;

/// Typed access to the check-in contract through a wallet session.
pub struct ContractClient<'a, P> {
    /// Wallet used for every request.
    provider: &'a P,
    /// Session whose account signs writes; `None` while disconnected.
    session: Option<Session>,
    /// Deployed contract.
    contract: Address,
    /// Delay between receipt polls.
    poll_interval: Duration,
    /// Discovery tuning for [`Self::get_user_nfts`].
    scan: ScanConfig,
}

impl<'a, P: WalletProvider> ContractClient<'a, P> {
    /// Creates a client. Usually obtained from
    /// [`WalletConnector::contract`](crate::wallet::WalletConnector::contract).
    #[must_use]
    pub const fn new(provider: &'a P, session: Option<Session>, config: &ChainConfig) -> Self {
        Self {
            provider,
            session,
            contract: config.contract_address,
            poll_interval: config.receipt_poll_interval(),
            scan: config.scan,
        }
    }

    /// Address of the contract this client talks to.
    #[must_use]
    pub const fn contract_address(&self) -> Address {
        self.contract
    }

    /// Address of the signing account.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::NotConnected`] without a session.
    pub fn current_address(&self) -> ChainResult<Address> {
        self.session
            .map(|session| session.account)
            .ok_or(ChainError::NotConnected)
    }

    fn request_object(&self, from: Address, data: &[u8]) -> serde_json::Value {
        json!({
            "from": from.to_string(),
            "to": self.contract.to_string(),
            "data": hex_data(data),
        })
    }

    async fn call<C: SolCall>(&self, call: &C) -> ChainResult<C::Return> {
        let from = self.current_address()?;
        let params = json!([self.request_object(from, &call.abi_encode()), "latest"]);

        let result = self.provider.request("eth_call", params).await?;
        let data = parse_data(&result)?;
        Ok(C::abi_decode_returns(&data, true)?)
    }

    async fn send<C: SolCall>(&self, call: &C) -> ChainResult<TransactionReceipt> {
        let from = self.current_address()?;
        let params = json!([self.request_object(from, &call.abi_encode())]);

        let tx_hash = parse_b256(&self.provider.request("eth_sendTransaction", params).await?)?;
        info!("submitted {} in {}", C::SIGNATURE, tx_hash);

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status {
            return Err(ChainError::Reverted {
                tx_hash: hex_data(tx_hash.as_slice()),
                receipt: Box::new(receipt),
            });
        }

        info!(
            "{} included in block {} (gas used {})",
            tx_hash, receipt.block_number, receipt.gas_used
        );
        Ok(receipt)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> ChainResult<TransactionReceipt> {
        let params = json!([hex_data(tx_hash.as_slice())]);
        loop {
            let receipt = self
                .provider
                .request("eth_getTransactionReceipt", params.clone())
                .await?;
            if !receipt.is_null() {
                return TransactionReceipt::from_json(&receipt);
            }
            debug!("waiting for {} to be mined", tx_hash);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Creates an event. It starts out pending admin approval.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or whatever the wallet or chain reports.
    pub async fn create_event(
        &self,
        name: &str,
        description: &str,
        start_time: u64,
        end_time: u64,
        max_participants: u64,
    ) -> ChainResult<TransactionReceipt> {
        self.send(&ICheckInNFT::createEventCall {
            name: name.to_string(),
            description: description.to_string(),
            startTime: U256::from(start_time),
            endTime: U256::from(end_time),
            maxParticipants: U256::from(max_participants),
        })
        .await
    }

    /// Approves a pending event. Admin only.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or whatever the wallet or chain reports.
    pub async fn approve_event(&self, event_id: U256) -> ChainResult<TransactionReceipt> {
        self.send(&ICheckInNFT::approveEventCall { eventId: event_id })
            .await
    }

    /// Rejects a pending event. Admin only.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or whatever the wallet or chain reports.
    pub async fn reject_event(&self, event_id: U256) -> ChainResult<TransactionReceipt> {
        self.send(&ICheckInNFT::rejectEventCall { eventId: event_id })
            .await
    }

    /// Checks the connected account in, minting its commemorative token.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or whatever the wallet or chain reports.
    pub async fn check_in(&self, event_id: U256, qr_code: &str) -> ChainResult<TransactionReceipt> {
        self.send(&ICheckInNFT::checkInCall {
            eventId: event_id,
            qrCode: qr_code.to_string(),
        })
        .await
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Fetches one event.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], a provider error for unknown IDs, or
    /// [`ChainError::Abi`] if the record does not decode.
    pub async fn get_event(&self, event_id: U256) -> ChainResult<EventRecord> {
        debug!("fetching event {}", event_id);
        let ret = self
            .call(&ICheckInNFT::getEventCall { eventId: event_id })
            .await?;
        EventRecord::try_from(ret.info)
    }

    /// Number of events ever created.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`] or a provider error.
    pub async fn get_event_count(&self) -> ChainResult<U256> {
        let count = self.call(&ICheckInNFT::getEventCountCall {}).await?.count;
        debug!("total event count: {}", count);
        Ok(count)
    }

    /// Whether `account` is a contract admin.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`] or a provider error.
    pub async fn is_admin(&self, account: Address) -> ChainResult<bool> {
        Ok(self
            .call(&ICheckInNFT::adminsCall { account })
            .await?
            .isAdmin)
    }

    /// Number of tokens held by `owner`.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`] or a provider error.
    pub async fn balance_of(&self, owner: Address) -> ChainResult<U256> {
        Ok(self.call(&ICheckInNFT::balanceOfCall { owner }).await?.balance)
    }

    /// Current owner of a token.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or a provider error for nonexistent tokens.
    pub async fn owner_of(&self, token_id: U256) -> ChainResult<Address> {
        Ok(self
            .call(&ICheckInNFT::ownerOfCall { tokenId: token_id })
            .await?
            .owner)
    }

    /// Metadata URI of a token.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or a provider error for nonexistent tokens.
    pub async fn token_uri(&self, token_id: U256) -> ChainResult<String> {
        Ok(self
            .call(&ICheckInNFT::tokenURICall { tokenId: token_id })
            .await?
            .uri)
    }

    /// All `CheckedIn` logs naming `participant`, oldest first.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`] or a provider error.
    pub async fn check_in_logs(&self, participant: Address) -> ChainResult<Vec<CheckInLog>> {
        self.current_address()?;

        let filter = json!({
            "address": self.contract.to_string(),
            "fromBlock": "0x0",
            "toBlock": "latest",
            "topics": [
                hex_data(CheckInLog::SIGNATURE_HASH.as_slice()),
                null,
                hex_data(address_topic(participant).as_slice()),
            ],
        });

        let logs = self.provider.request("eth_getLogs", json!([filter])).await?;
        let logs = logs
            .as_array()
            .ok_or_else(|| ChainError::MalformedResponse(format!("logs: expected array, got {logs}")))?;

        let mut parsed = Vec::with_capacity(logs.len());
        for log in logs {
            match RawLog::from_json(log).ok().as_ref().and_then(EventParser::parse_log) {
                Some(entry) if entry.participant == participant => parsed.push(entry),
                _ => debug!("skipping unrelated log entry"),
            }
        }
        debug!("found {} CheckedIn logs for {}", parsed.len(), participant);
        Ok(parsed)
    }

    /// Tokens owned by the connected account, with metadata, ascending by ID.
    ///
    /// Uses [`LogScanDiscovery`]; see [`Self::get_user_nfts_with`] to plug in
    /// a different strategy.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or a provider error from the balance read.
    pub async fn get_user_nfts(&self) -> ChainResult<Vec<OwnedToken>> {
        self.get_user_nfts_with(&LogScanDiscovery::new(self.scan))
            .await
    }

    /// Tokens owned by the connected account, found by `strategy`.
    ///
    /// # Errors
    ///
    /// [`ChainError::NotConnected`], or whatever the strategy reports.
    pub async fn get_user_nfts_with<D: NftDiscovery>(
        &self,
        strategy: &D,
    ) -> ChainResult<Vec<OwnedToken>> {
        let owner = self.current_address()?;
        strategy.discover(self, owner).await
    }
}

impl<P: WalletProvider> TokenReader for ContractClient<'_, P> {
    async fn balance_of(&self, owner: Address) -> ChainResult<U256> {
        ContractClient::balance_of(self, owner).await
    }

    async fn owner_of(&self, token_id: U256) -> ChainResult<Address> {
        ContractClient::owner_of(self, token_id).await
    }

    async fn token_uri(&self, token_id: U256) -> ChainResult<String> {
        ContractClient::token_uri(self, token_id).await
    }

    async fn event_count(&self) -> ChainResult<U256> {
        self.get_event_count().await
    }

    async fn checked_in_token_ids(&self, recipient: Address) -> ChainResult<Vec<U256>> {
        Ok(self
            .check_in_logs(recipient)
            .await?
            .into_iter()
            .map(|log| log.token_id)
            .collect())
    }
}
