//! # NFT Discovery
//!
//! The contract has no enumerable-ownership index, so the tokens an account
//! holds have to be found. [`NftDiscovery`] is the seam: callers ask for
//! "tokens owned by X" and do not care how they are found, so an indexing
//! service can replace the heuristic below without touching them.
//!
//! ## `LogScanDiscovery`
//!
//! ```text
//! balanceOf(owner) = N ──── N == 0 ───▶ []
//!        │
//!        ▼
//! CheckedIn logs (recipient = owner) ──▶ candidates ──▶ ownerOf == owner?
//!        │
//!        ▼  found < N
//! scan ownerOf(1..=bound), bound = max(floor, eventCount * multiplier)
//!        │
//!        ▼
//! sort ascending by token ID
//! ```
//!
//! The scan always halts but may miss tokens whose IDs lie beyond the
//! bound. Nothing on-chain ties token IDs to the event count.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, U256};
use cenft_shared::{DEFAULT_SCAN_FLOOR, DEFAULT_SCAN_MULTIPLIER, SCAN_PROGRESS_INTERVAL};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ChainResult;
use crate::metadata::{parse_token_uri, TokenMetadata};

/// Read-side view of the contract needed by discovery strategies.
#[allow(async_fn_in_trait)]
pub trait TokenReader {
    /// Number of tokens held by `owner`.
    async fn balance_of(&self, owner: Address) -> ChainResult<U256>;

    /// Current owner of a token. Fails for nonexistent tokens.
    async fn owner_of(&self, token_id: U256) -> ChainResult<Address>;

    /// Metadata URI of a token.
    async fn token_uri(&self, token_id: U256) -> ChainResult<String>;

    /// Number of events ever created.
    async fn event_count(&self) -> ChainResult<U256>;

    /// Token IDs from `CheckedIn` logs naming `recipient`. May contain
    /// duplicates and tokens since transferred away.
    async fn checked_in_token_ids(&self, recipient: Address) -> ChainResult<Vec<U256>>;
}

/// Strategy that finds the tokens an account owns.
#[allow(async_fn_in_trait)]
pub trait NftDiscovery {
    /// Returns at most `balanceOf(owner)` tokens, unique, ascending by ID.
    async fn discover<R: TokenReader>(&self, reader: &R, owner: Address) -> ChainResult<Vec<OwnedToken>>;
}

/// A token held by the queried account.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedToken {
    /// Token ID.
    pub token_id: U256,
    /// Decoded metadata.
    pub metadata: TokenMetadata,
}

impl OwnedToken {
    /// Metadata fields with a decimal `tokenId` string added.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut fields = self.metadata.fields().clone();
        fields.insert("tokenId".to_string(), Value::String(self.token_id.to_string()));
        Value::Object(fields)
    }
}

/// Tuning for the brute-force scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Lowest scan bound.
    pub floor: u64,
    /// Bound per created event.
    pub multiplier: u64,
    /// Log progress every this many IDs (0 disables).
    pub progress_interval: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            floor: DEFAULT_SCAN_FLOOR,
            multiplier: DEFAULT_SCAN_MULTIPLIER,
            progress_interval: SCAN_PROGRESS_INTERVAL,
        }
    }
}

impl ScanConfig {
    /// Highest token ID to probe: `max(floor, event_count * multiplier)`.
    ///
    /// An unknown event count yields the floor.
    #[must_use]
    pub fn upper_bound(&self, event_count: Option<U256>) -> u64 {
        let events = event_count.map_or(0, |count| u64::try_from(count).unwrap_or(u64::MAX));
        events.saturating_mul(self.multiplier).max(self.floor)
    }
}

/// Event-log lookup, then a bounded ascending scan of token IDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogScanDiscovery {
    scan: ScanConfig,
}

impl LogScanDiscovery {
    /// Creates the strategy.
    #[must_use]
    pub const fn new(scan: ScanConfig) -> Self {
        Self { scan }
    }

    async fn load_metadata<R: TokenReader>(reader: &R, token_id: U256) -> TokenMetadata {
        match reader.token_uri(token_id).await {
            Ok(uri) => parse_token_uri(&uri),
            Err(e) => {
                warn!("failed to read tokenURI of #{}: {}", token_id, e);
                TokenMetadata::unavailable(token_id)
            }
        }
    }

    /// Confirms log candidates against current ownership.
    async fn confirm_logged<R: TokenReader>(
        reader: &R,
        owner: Address,
        wanted: u64,
        found: &mut BTreeMap<U256, TokenMetadata>,
    ) {
        let candidates: BTreeSet<U256> = match reader.checked_in_token_ids(owner).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!("CheckedIn log query failed: {}", e);
                return;
            }
        };
        debug!("{} candidate tokens from CheckedIn logs", candidates.len());

        for token_id in candidates {
            if found.len() as u64 >= wanted {
                break;
            }
            match reader.owner_of(token_id).await {
                Ok(current) if current == owner => {
                    let metadata = Self::load_metadata(reader, token_id).await;
                    found.insert(token_id, metadata);
                }
                Ok(current) => debug!("token #{} now belongs to {}", token_id, current),
                Err(e) => debug!("ownership check of #{} failed: {}", token_id, e),
            }
        }
    }

    /// Probes ascending token IDs until `wanted` tokens are known or the
    /// bound is exhausted.
    async fn scan_ids<R: TokenReader>(
        &self,
        reader: &R,
        owner: Address,
        wanted: u64,
        found: &mut BTreeMap<U256, TokenMetadata>,
    ) {
        let event_count = match reader.event_count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("event count unavailable, scanning up to {}: {}", self.scan.floor, e);
                None
            }
        };
        let bound = self.scan.upper_bound(event_count);
        let remaining = wanted.saturating_sub(found.len() as u64);
        info!("scanning token IDs 1..={} for {} more tokens", bound, remaining);

        let mut hits = 0u64;
        for id in 1..=bound {
            if hits >= remaining {
                break;
            }
            let token_id = U256::from(id);
            if found.contains_key(&token_id) {
                continue;
            }

            // Nonexistent IDs fail the lookup; that only means "not owned"
            if let Ok(current) = reader.owner_of(token_id).await {
                if current == owner {
                    hits += 1;
                    let metadata = Self::load_metadata(reader, token_id).await;
                    found.insert(token_id, metadata);
                }
            }

            if self.scan.progress_interval != 0 && id % self.scan.progress_interval == 0 {
                debug!("scanned token IDs up to {}", id);
            }
        }

        if hits < remaining {
            warn!("scan exhausted at {}, {} tokens not found", bound, remaining - hits);
        }
    }
}

impl NftDiscovery for LogScanDiscovery {
    async fn discover<R: TokenReader>(&self, reader: &R, owner: Address) -> ChainResult<Vec<OwnedToken>> {
        let balance = reader.balance_of(owner).await?;
        let wanted = u64::try_from(balance).unwrap_or(u64::MAX);
        info!("{} holds {} tokens", owner, wanted);

        if wanted == 0 {
            return Ok(Vec::new());
        }

        let mut found = BTreeMap::new();
        Self::confirm_logged(reader, owner, wanted, &mut found).await;

        if (found.len() as u64) < wanted {
            self.scan_ids(reader, owner, wanted, &mut found).await;
        }

        info!("discovered {} of {} tokens for {}", found.len(), wanted, owner);

        // BTreeMap iteration is ascending by token ID
        Ok(found
            .into_iter()
            .map(|(token_id, metadata)| OwnedToken { token_id, metadata })
            .collect())
    }
}
