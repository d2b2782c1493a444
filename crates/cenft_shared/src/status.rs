//! # Event Status
//!
//! Lifecycle of an on-chain event record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Review status of an event. Stored on-chain as a `uint8`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Created by an organizer, waiting for an admin.
    #[default]
    Pending,
    /// Approved by an admin; check-ins are accepted.
    Approved,
    /// Rejected by an admin.
    Rejected,
}

/// Raised when the contract reports a status byte outside the known range.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown event status: {0}")]
pub struct UnknownStatus(pub u8);

impl EventStatus {
    /// Returns the on-chain encoding.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Approved => 1,
            Self::Rejected => 2,
        }
    }

    /// Whether participants may check in to an event with this status.
    #[inline]
    #[must_use]
    pub const fn accepts_check_ins(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl TryFrom<u8> for EventStatus {
    type Error = UnknownStatus;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Approved),
            2 => Ok(Self::Rejected),
            other => Err(UnknownStatus(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_encoding() {
        for status in [EventStatus::Pending, EventStatus::Approved, EventStatus::Rejected] {
            assert_eq!(EventStatus::try_from(status.as_u8()), Ok(status));
        }
        assert_eq!(EventStatus::try_from(7), Err(UnknownStatus(7)));
    }

    #[test]
    fn test_only_approved_accepts_check_ins() {
        assert!(EventStatus::Approved.accepts_check_ins());
        assert!(!EventStatus::Pending.accepts_check_ins());
        assert!(!EventStatus::Rejected.accepts_check_ins());
    }
}
