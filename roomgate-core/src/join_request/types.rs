//! Join request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomgateError};
use crate::ids::{JoinRequestId, RoomId, UserId};
use crate::membership::Membership;

/// Longest message a requester may attach, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Status of a join request. Only `Pending` is non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    /// Awaiting the host's decision.
    Pending,
    /// Accepted; the requester was admitted.
    Approved,
    /// Declined by the host.
    Rejected,
    /// Withdrawn by the requester.
    Cancelled,
}

impl JoinRequestStatus {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A request to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Request id.
    pub id: JoinRequestId,
    /// Target room.
    pub room_id: RoomId,
    /// Requester.
    pub user_id: UserId,
    /// Current status.
    pub status: JoinRequestStatus,
    /// Optional note to the host.
    pub message: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A host's edit of a pending request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRequestUpdate {
    /// `Approved` or `Rejected`; other targets are rejected.
    pub status: Option<JoinRequestStatus>,
    /// Replacement message; `Some(None)` clears it.
    pub message: Option<Option<String>>,
}

impl JoinRequestUpdate {
    /// An approval.
    #[must_use]
    pub const fn approve() -> Self {
        Self {
            status: Some(JoinRequestStatus::Approved),
            message: None,
        }
    }

    /// A rejection.
    #[must_use]
    pub const fn reject() -> Self {
        Self {
            status: Some(JoinRequestStatus::Rejected),
            message: None,
        }
    }
}

/// Result of updating a request: the request and, when approved, the
/// membership it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequestOutcome {
    /// The updated request.
    pub request: JoinRequest,
    /// The admitted membership, if the update approved the request.
    pub membership: Option<Membership>,
}

pub(crate) fn validate_message(message: Option<&str>) -> Result<()> {
    if message.is_some_and(|m| m.chars().count() > MAX_MESSAGE_CHARS) {
        return Err(RoomgateError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(())
}
