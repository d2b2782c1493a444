//! # Contract Events
//!
//! Parsing of `CheckedIn` logs from raw topics and data.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;

use crate::contracts::ICheckInNFT;
use crate::rpc::{address_topic, u256_topic, RawLog};

/// A decoded `CheckedIn(eventId, participant, tokenId)` log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckInLog {
    /// Event the participant checked in to.
    pub event_id: U256,
    /// Recipient of the minted token.
    pub participant: Address,
    /// Token minted for the check-in.
    pub token_id: U256,
    /// Block where this occurred, if known.
    pub block_number: Option<u64>,
}

impl CheckInLog {
    /// Signature hash, `topics[0]` of every `CheckedIn` log.
    pub const SIGNATURE_HASH: B256 = ICheckInNFT::CheckedIn::SIGNATURE_HASH;

    /// Encodes this log as emitted by `contract`.
    #[must_use]
    pub fn to_raw_log(&self, contract: Address, log_index: u64) -> RawLog {
        RawLog {
            address: contract,
            topics: vec![
                Self::SIGNATURE_HASH,
                u256_topic(self.event_id),
                address_topic(self.participant),
            ],
            data: self.token_id.to_be_bytes::<32>().to_vec(),
            block_number: self.block_number,
            log_index: Some(log_index),
        }
    }
}

/// Event parser for raw log data.
pub struct EventParser;

impl EventParser {
    /// Parses a `CheckedIn` log from raw parts.
    ///
    /// # Arguments
    ///
    /// * `topics` - signature hash, `eventId`, `participant`
    /// * `data` - the non-indexed `tokenId` word
    /// * `block_number` - block where the log was emitted
    ///
    /// # Returns
    ///
    /// Parsed log or `None` if the layout or signature does not match.
    #[must_use]
    pub fn parse_checked_in(
        topics: &[B256],
        data: &[u8],
        block_number: Option<u64>,
    ) -> Option<CheckInLog> {
        // Validate topic count (event sig + eventId + participant = 3)
        if topics.len() < 3 || data.len() < 32 {
            return None;
        }
        if topics[0] != CheckInLog::SIGNATURE_HASH {
            return None;
        }

        // Address occupies the low 20 bytes of its topic
        let participant = Address::from_slice(&topics[2][12..32]);

        Some(CheckInLog {
            event_id: U256::from_be_slice(topics[1].as_slice()),
            participant,
            token_id: U256::from_be_slice(&data[..32]),
            block_number,
        })
    }

    /// Parses a `CheckedIn` log from a [`RawLog`].
    #[must_use]
    pub fn parse_log(log: &RawLog) -> Option<CheckInLog> {
        Self::parse_checked_in(&log.topics, &log.data, log.block_number)
    }
}
