//! # CENFT Shared
//!
//! Common types used by the chain client and any UI built on top of it.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - an async runtime
//! - a wallet or RPC transport
//!
//! If you need chain access, put it in `cenft_chain`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod routes;
pub mod status;

pub use constants::{
    DEFAULT_SCAN_FLOOR, DEFAULT_SCAN_MULTIPLIER, SCAN_PROGRESS_INTERVAL, UNRECOGNIZED_CHAIN_CODE,
    WALLET_CONNECTED_KEY,
};
pub use routes::{Route, RouteError};
pub use status::{EventStatus, UnknownStatus};
