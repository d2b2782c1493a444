//! # Contract Simulator
//!
//! In-memory wallet and check-in contract behind the [`WalletProvider`]
//! seam. Used by tests and benchmarks to run the full client without a
//! node or a browser.
//!
//! The simulated wallet starts on chain 1 and knows only that chain, so a
//! `connect` to any other network goes through the add-network path.
//! Writes are mined instantly: every `eth_sendTransaction` immediately has
//! a receipt, with status 0 when the contract rejects the call.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{hex, keccak256, Address, B256, U256};
use alloy_sol_types::{SolCall, SolInterface};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cenft_shared::{EventStatus, UNRECOGNIZED_CHAIN_CODE};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::contracts::{EventRecord, ICheckInNFT};
use crate::events::CheckInLog;
use crate::metadata::INLINE_JSON_PREFIX;
use crate::rpc::{
    parse_address, parse_b256, parse_data, parse_quantity, quantity, ProviderError, RawLog,
    TransactionReceipt, WalletProvider, EXECUTION_REVERTED_CODE, USER_REJECTED_CODE,
};

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// JSON-RPC "invalid params".
const INVALID_PARAMS_CODE: i64 = -32602;

/// Gas charged for every simulated transaction.
const SIMULATED_GAS: u64 = 21_000;

#[derive(Default)]
struct SimState {
    // Wallet
    accounts: Vec<Address>,
    authorized: bool,
    chain_id: u64,
    known_chains: BTreeSet<u64>,
    reject_switch: bool,
    reject_add: bool,
    reject_accounts: bool,

    // Chain
    block_number: u64,
    timestamp: u64,
    logs: Vec<RawLog>,
    receipts: BTreeMap<B256, TransactionReceipt>,
    nonce: u64,

    // Contract
    admins: BTreeSet<Address>,
    events: Vec<EventRecord>,
    owners: BTreeMap<U256, Address>,
    token_uris: BTreeMap<U256, String>,
    checked_in: BTreeSet<(U256, Address)>,
    next_token_id: u64,

    // Stats
    requests: BTreeMap<String, u64>,
    ownership_lookups: u64,
}

/// Simulated wallet plus check-in contract.
pub struct ContractSimulator {
    contract: Address,
    state: Mutex<SimState>,
}

fn revert(reason: &str) -> ProviderError {
    ProviderError::new(EXECUTION_REVERTED_CODE, format!("execution reverted: {reason}"))
}

fn invalid_params(reason: impl std::fmt::Display) -> ProviderError {
    ProviderError::new(INVALID_PARAMS_CODE, format!("invalid params: {reason}"))
}

impl ContractSimulator {
    /// Creates a simulator for a contract deployed at `contract`.
    #[must_use]
    pub fn new(contract: Address) -> Self {
        let state = SimState {
            chain_id: 1,
            known_chains: BTreeSet::from([1]),
            block_number: 1,
            timestamp: 1_700_000_000,
            next_token_id: 1,
            ..SimState::default()
        };

        Self {
            contract,
            state: Mutex::new(state),
        }
    }

    /// Adds an account to the wallet.
    #[must_use]
    pub fn with_account(self, account: Address) -> Self {
        self.state.lock().accounts.push(account);
        self
    }

    /// Makes the wallet already know a chain.
    #[must_use]
    pub fn with_known_chain(self, chain_id: u64) -> Self {
        self.state.lock().known_chains.insert(chain_id);
        self
    }

    /// Grants `account` admin rights on the contract.
    #[must_use]
    pub fn with_admin(self, account: Address) -> Self {
        self.state.lock().admins.insert(account);
        self
    }

    /// Contract address.
    #[must_use]
    pub const fn contract(&self) -> Address {
        self.contract
    }

    /// Makes `account` the wallet's active account, as a user switching
    /// accounts in the wallet would.
    pub fn switch_account(&self, account: Address) {
        let mut state = self.state.lock();
        state.accounts.retain(|a| *a != account);
        state.accounts.insert(0, account);
    }

    /// Whether `eth_accounts` reports accounts without a prompt.
    pub fn set_authorized(&self, authorized: bool) {
        self.state.lock().authorized = authorized;
    }

    /// Makes the wallet refuse chain switches.
    pub fn reject_network_switch(&self, reject: bool) {
        self.state.lock().reject_switch = reject;
    }

    /// Makes the wallet refuse to add chains.
    pub fn reject_network_add(&self, reject: bool) {
        self.state.lock().reject_add = reject;
    }

    /// Makes the wallet refuse account access.
    pub fn reject_account_request(&self, reject: bool) {
        self.state.lock().reject_accounts = reject;
    }

    /// Sets the block timestamp used for check-in windows.
    pub fn set_timestamp(&self, timestamp: u64) {
        self.state.lock().timestamp = timestamp;
    }

    /// Current block timestamp.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.state.lock().timestamp
    }

    /// Mints a token directly, bypassing check-in.
    ///
    /// With `emit_log == false` the token is invisible to log queries and
    /// can only be found by scanning.
    pub fn mint(&self, to: Address, uri: impl Into<String>, emit_log: bool) -> U256 {
        let mut state = self.state.lock();
        let token_id = U256::from(state.next_token_id);
        state.next_token_id += 1;
        state.owners.insert(token_id, to);
        state.token_uris.insert(token_id, uri.into());

        if emit_log {
            let log = CheckInLog {
                event_id: U256::ZERO,
                participant: to,
                token_id,
                block_number: Some(state.block_number),
            };
            let index = state.logs.len() as u64;
            state.logs.push(log.to_raw_log(self.contract, index));
        }
        token_id
    }

    /// Skips token IDs, leaving a gap no token will ever occupy.
    pub fn skip_token_ids(&self, count: u64) {
        self.state.lock().next_token_id += count;
    }

    /// Moves a token without emitting any log.
    pub fn transfer(&self, token_id: U256, to: Address) {
        if let Some(owner) = self.state.lock().owners.get_mut(&token_id) {
            *owner = to;
        }
    }

    /// Owner of a token, read directly from state.
    #[must_use]
    pub fn owner(&self, token_id: U256) -> Option<Address> {
        self.state.lock().owners.get(&token_id).copied()
    }

    /// Number of `ownerOf` calls served.
    #[must_use]
    pub fn ownership_lookups(&self) -> u64 {
        self.state.lock().ownership_lookups
    }

    /// Number of requests served for `method`.
    #[must_use]
    pub fn request_count(&self, method: &str) -> u64 {
        self.state.lock().requests.get(method).copied().unwrap_or(0)
    }

    /// Number of requests served in total.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.state.lock().requests.values().sum()
    }

    /// Handles one request synchronously.
    ///
    /// # Errors
    ///
    /// Returns the [`ProviderError`] a real wallet or node would.
    pub fn handle(&self, method: &str, params: &Value) -> Result<Value, ProviderError> {
        let mut state = self.state.lock();
        *state.requests.entry(method.to_string()).or_default() += 1;

        match method {
            "eth_accounts" => Ok(if state.authorized {
                json!(accounts_json(&state.accounts))
            } else {
                json!([])
            }),
            "eth_requestAccounts" => {
                if state.reject_accounts {
                    return Err(ProviderError::new(USER_REJECTED_CODE, "User rejected the request."));
                }
                state.authorized = true;
                Ok(json!(accounts_json(&state.accounts)))
            }
            "eth_chainId" => Ok(json!(quantity(state.chain_id))),
            "wallet_switchEthereumChain" => {
                let chain_id = parse_quantity(&params[0]["chainId"]).map_err(invalid_params)?;
                if state.reject_switch {
                    return Err(ProviderError::new(USER_REJECTED_CODE, "User rejected the request."));
                }
                if !state.known_chains.contains(&chain_id) {
                    return Err(ProviderError::new(
                        UNRECOGNIZED_CHAIN_CODE,
                        format!("Unrecognized chain ID {}", quantity(chain_id)),
                    ));
                }
                state.chain_id = chain_id;
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id = parse_quantity(&params[0]["chainId"]).map_err(invalid_params)?;
                if state.reject_add {
                    return Err(ProviderError::new(USER_REJECTED_CODE, "User rejected the request."));
                }
                state.known_chains.insert(chain_id);
                state.chain_id = chain_id;
                Ok(Value::Null)
            }
            "eth_call" => {
                let data = self.calldata(&params[0])?;
                self.view(&mut state, &data).map(|out| json!(format!("0x{}", hex::encode(out))))
            }
            "eth_sendTransaction" => {
                let from = parse_address(&params[0]["from"]).map_err(invalid_params)?;
                let data = self.calldata(&params[0])?;
                Ok(json!(format!("0x{}", hex::encode(self.transact(&mut state, from, &data)))))
            }
            "eth_getTransactionReceipt" => {
                let hash = parse_b256(&params[0]).map_err(invalid_params)?;
                Ok(state
                    .receipts
                    .get(&hash)
                    .map_or(Value::Null, TransactionReceipt::to_json))
            }
            "eth_getLogs" => Ok(self.logs(&state, &params[0])),
            _ => Err(ProviderError::new(
                METHOD_NOT_FOUND_CODE,
                format!("method {method} not supported"),
            )),
        }
    }

    fn calldata(&self, tx: &Value) -> Result<Vec<u8>, ProviderError> {
        let to = parse_address(&tx["to"]).map_err(invalid_params)?;
        if to != self.contract {
            return Err(invalid_params(format!("no contract at {to}")));
        }
        parse_data(&tx["data"]).map_err(invalid_params)
    }

    fn logs(&self, state: &SimState, filter: &Value) -> Value {
        let wanted_topic = |i: usize| -> Option<B256> { parse_b256(&filter["topics"][i]).ok() };
        let topics: Vec<Option<B256>> = (0..4).map(wanted_topic).collect();

        let matching: Vec<Value> = state
            .logs
            .iter()
            .filter(|log| log.address == self.contract)
            .filter(|log| {
                topics.iter().enumerate().all(|(i, wanted)| match wanted {
                    Some(topic) => log.topics.get(i) == Some(topic),
                    None => true,
                })
            })
            .map(RawLog::to_json)
            .collect();
        json!(matching)
    }

    // =========================================================================
    // CONTRACT
    // =========================================================================

    fn view(&self, state: &mut SimState, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
        use ICheckInNFT::ICheckInNFTCalls as Call;

        let call = Call::abi_decode(data, true).map_err(|e| revert(&e.to_string()))?;
        match call {
            Call::getEvent(c) => {
                let record = event_index(state, c.eventId)
                    .map(|i| &state.events[i])
                    .ok_or_else(|| revert("event does not exist"))?;
                let info = ICheckInNFT::EventInfo::from(record);
                Ok(ICheckInNFT::getEventCall::abi_encode_returns(&(info,)))
            }
            Call::getEventCount(_) => {
                let count = U256::from(state.events.len());
                Ok(ICheckInNFT::getEventCountCall::abi_encode_returns(&(count,)))
            }
            Call::admins(c) => {
                let is_admin = state.admins.contains(&c.account);
                Ok(ICheckInNFT::adminsCall::abi_encode_returns(&(is_admin,)))
            }
            Call::balanceOf(c) => {
                let balance = U256::from(state.owners.values().filter(|o| **o == c.owner).count());
                Ok(ICheckInNFT::balanceOfCall::abi_encode_returns(&(balance,)))
            }
            Call::ownerOf(c) => {
                state.ownership_lookups += 1;
                let owner = *state
                    .owners
                    .get(&c.tokenId)
                    .ok_or_else(|| revert("ERC721NonexistentToken"))?;
                Ok(ICheckInNFT::ownerOfCall::abi_encode_returns(&(owner,)))
            }
            Call::tokenURI(c) => {
                let uri = state
                    .token_uris
                    .get(&c.tokenId)
                    .cloned()
                    .ok_or_else(|| revert("ERC721NonexistentToken"))?;
                Ok(ICheckInNFT::tokenURICall::abi_encode_returns(&(uri,)))
            }
            _ => Err(revert("not a view function")),
        }
    }

    /// Executes a write and records its receipt. Returns the transaction hash.
    fn transact(&self, state: &mut SimState, from: Address, data: &[u8]) -> B256 {
        state.nonce += 1;
        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&state.nonce.to_be_bytes());
        preimage.extend_from_slice(data);
        let tx_hash = keccak256(&preimage);

        state.block_number += 1;
        let (status, logs) = match self.execute(state, from, data) {
            Ok(logs) => (true, logs),
            Err(_) => (false, Vec::new()),
        };
        state.logs.extend(logs.iter().cloned());

        state.receipts.insert(
            tx_hash,
            TransactionReceipt {
                transaction_hash: tx_hash,
                block_number: state.block_number,
                status,
                gas_used: SIMULATED_GAS,
                logs,
            },
        );
        tx_hash
    }

    fn execute(
        &self,
        state: &mut SimState,
        from: Address,
        data: &[u8],
    ) -> Result<Vec<RawLog>, ProviderError> {
        use ICheckInNFT::ICheckInNFTCalls as Call;

        let call = Call::abi_decode(data, true).map_err(|e| revert(&e.to_string()))?;
        match call {
            Call::createEvent(c) => {
                if c.endTime <= c.startTime || c.maxParticipants == U256::ZERO {
                    return Err(revert("invalid event parameters"));
                }
                let to_u64 = |value: U256| {
                    u64::try_from(value).map_err(|_| revert("value out of range"))
                };
                let id = U256::from(state.events.len() + 1);
                let seed = format!("{id}:{}:{from}", c.name);
                let record = EventRecord {
                    id,
                    organizer: from,
                    start_time: to_u64(c.startTime)?,
                    end_time: to_u64(c.endTime)?,
                    max_participants: to_u64(c.maxParticipants)?,
                    current_participants: 0,
                    status: EventStatus::Pending,
                    qr_code_hash: hex::encode(&keccak256(seed.as_bytes())[..16]),
                    name: c.name,
                    description: c.description,
                };
                state.events.push(record);
                Ok(Vec::new())
            }
            Call::approveEvent(c) => review(state, from, c.eventId, EventStatus::Approved),
            Call::rejectEvent(c) => review(state, from, c.eventId, EventStatus::Rejected),
            Call::checkIn(c) => self.check_in(state, from, c.eventId, &c.qrCode),
            _ => Err(revert("not a write function")),
        }
    }

    fn check_in(
        &self,
        state: &mut SimState,
        from: Address,
        event_id: U256,
        qr_code: &str,
    ) -> Result<Vec<RawLog>, ProviderError> {
        let index = event_index(state, event_id).ok_or_else(|| revert("event does not exist"))?;
        let event = &state.events[index];

        if !event.status.accepts_check_ins() {
            return Err(revert("event not approved"));
        }
        if !(event.start_time..=event.end_time).contains(&state.timestamp) {
            return Err(revert("outside check-in window"));
        }
        if event.qr_code_hash != qr_code {
            return Err(revert("invalid check-in code"));
        }
        if event.is_full() {
            return Err(revert("event is full"));
        }
        if state.checked_in.contains(&(event_id, from)) {
            return Err(revert("already checked in"));
        }

        let token_id = U256::from(state.next_token_id);
        let metadata = json!({
            "name": format!("{} #{token_id}", event.name),
            "description": event.description,
            "attributes": [{ "trait_type": "Event", "value": event_id.to_string() }],
        });
        let uri = format!("{INLINE_JSON_PREFIX}{}", STANDARD.encode(metadata.to_string()));

        state.next_token_id += 1;
        state.events[index].current_participants += 1;
        state.checked_in.insert((event_id, from));
        state.owners.insert(token_id, from);
        state.token_uris.insert(token_id, uri);

        let log = CheckInLog {
            event_id,
            participant: from,
            token_id,
            block_number: Some(state.block_number),
        };
        Ok(vec![log.to_raw_log(self.contract, state.logs.len() as u64)])
    }
}

fn accounts_json(accounts: &[Address]) -> Vec<String> {
    accounts.iter().map(ToString::to_string).collect()
}

/// Event IDs start at 1.
fn event_index(state: &SimState, event_id: U256) -> Option<usize> {
    let id = usize::try_from(u64::try_from(event_id).ok()?).ok()?;
    (1..=state.events.len()).contains(&id).then(|| id - 1)
}

fn review(
    state: &mut SimState,
    from: Address,
    event_id: U256,
    status: EventStatus,
) -> Result<Vec<RawLog>, ProviderError> {
    if !state.admins.contains(&from) {
        return Err(revert("caller is not an admin"));
    }
    let index = event_index(state, event_id).ok_or_else(|| revert("event does not exist"))?;
    let event = &mut state.events[index];
    if event.status != EventStatus::Pending {
        return Err(revert("event already reviewed"));
    }
    event.status = status;
    Ok(Vec::new())
}

impl WalletProvider for ContractSimulator {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.handle(method, &params)
    }
}
