//! # Contract Definitions
//!
//! ABI of the event check-in contract and the Rust-side event record.

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use cenft_shared::EventStatus;

use crate::error::{ChainError, ChainResult};

// Define the check-in contract interface using alloy's sol! macro
sol! {
    /// Event registry that mints a commemorative NFT on check-in.
    #[derive(Debug)]
    interface ICheckInNFT {
        /// On-chain event record.
        struct EventInfo {
            uint256 id;
            string name;
            string description;
            address organizer;
            uint256 startTime;
            uint256 endTime;
            uint256 maxParticipants;
            uint256 currentParticipants;
            uint8 status;
            string qrCodeHash;
        }

        /// Emitted when a participant checks in and receives a token.
        event CheckedIn(uint256 indexed eventId, address indexed participant, uint256 tokenId);

        function createEvent(
            string name,
            string description,
            uint256 startTime,
            uint256 endTime,
            uint256 maxParticipants
        ) external;

        function approveEvent(uint256 eventId) external;

        function rejectEvent(uint256 eventId) external;

        function checkIn(uint256 eventId, string qrCode) external;

        function getEvent(uint256 eventId) external view returns (EventInfo info);

        function getEventCount() external view returns (uint256 count);

        function admins(address account) external view returns (bool isAdmin);

        function balanceOf(address owner) external view returns (uint256 balance);

        function ownerOf(uint256 tokenId) external view returns (address owner);

        function tokenURI(uint256 tokenId) external view returns (string uri);
    }
}

/// Rust representation of an on-chain event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    /// Event identifier, immutable once created.
    pub id: U256,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Address that created the event.
    pub organizer: Address,
    /// Check-in window start (unix seconds).
    pub start_time: u64,
    /// Check-in window end (unix seconds).
    pub end_time: u64,
    /// Participant cap.
    pub max_participants: u64,
    /// Participants checked in so far.
    pub current_participants: u64,
    /// Review status.
    pub status: EventStatus,
    /// Hash embedded in the check-in link.
    pub qr_code_hash: String,
}

fn to_u64(value: U256, field: &str) -> ChainResult<u64> {
    u64::try_from(value).map_err(|_| ChainError::Abi(format!("{field} out of range: {value}")))
}

impl TryFrom<ICheckInNFT::EventInfo> for EventRecord {
    type Error = ChainError;

    fn try_from(info: ICheckInNFT::EventInfo) -> ChainResult<Self> {
        Ok(Self {
            id: info.id,
            start_time: to_u64(info.startTime, "startTime")?,
            end_time: to_u64(info.endTime, "endTime")?,
            max_participants: to_u64(info.maxParticipants, "maxParticipants")?,
            current_participants: to_u64(info.currentParticipants, "currentParticipants")?,
            status: EventStatus::try_from(info.status).map_err(|e| ChainError::Abi(e.to_string()))?,
            name: info.name,
            description: info.description,
            organizer: info.organizer,
            qr_code_hash: info.qrCodeHash,
        })
    }
}

impl From<&EventRecord> for ICheckInNFT::EventInfo {
    fn from(record: &EventRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            organizer: record.organizer,
            startTime: U256::from(record.start_time),
            endTime: U256::from(record.end_time),
            maxParticipants: U256::from(record.max_participants),
            currentParticipants: U256::from(record.current_participants),
            status: record.status.as_u8(),
            qrCodeHash: record.qr_code_hash.clone(),
        }
    }
}

impl EventRecord {
    /// Whether the participant cap has been reached.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    /// Seats left before the cap.
    #[inline]
    #[must_use]
    pub const fn remaining_capacity(&self) -> u64 {
        self.max_participants.saturating_sub(self.current_participants)
    }

    /// Whether a check-in at `timestamp` would be accepted.
    ///
    /// Advisory only; the contract enforces the same rules.
    #[must_use]
    pub fn is_open_at(&self, timestamp: u64) -> bool {
        self.status.accepts_check_ins()
            && (self.start_time..=self.end_time).contains(&timestamp)
            && !self.is_full()
    }
}
