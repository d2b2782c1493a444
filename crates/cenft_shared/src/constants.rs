//! # Protocol Constants
//!
//! Values shared between the wallet session logic and token discovery.

// =============================================================================
// WALLET SESSION
// =============================================================================

/// Key under which the "wallet previously connected" flag is persisted.
pub const WALLET_CONNECTED_KEY: &str = "wallet_connected";

/// EIP-1193 error code returned by `wallet_switchEthereumChain` when the
/// wallet does not know the requested chain.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

// =============================================================================
// TOKEN DISCOVERY
// =============================================================================

/// Lowest upper bound for the brute-force token ID scan.
pub const DEFAULT_SCAN_FLOOR: u64 = 100;

/// Scan bound multiplier applied to the on-chain event count.
///
/// The bound `max(floor, event_count * multiplier)` is a heuristic. Nothing
/// on-chain ties token IDs to the event count.
pub const DEFAULT_SCAN_MULTIPLIER: u64 = 3;

/// Emit a progress log every this many scanned token IDs.
pub const SCAN_PROGRESS_INTERVAL: u64 = 50;
