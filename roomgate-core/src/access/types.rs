//! Access decision types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RoomId, UserId};
use crate::membership::MembershipStatus;

/// Why an exact-location request was granted or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// No room with that id.
    RoomNotFound,
    /// The room was deleted.
    RoomInactive,
    /// The caller hosts the room.
    UserIsHost,
    /// The caller holds an active seat.
    UserIsActiveMember,
    /// The caller has a membership row that is not active.
    MembershipStatus(MembershipStatus),
    /// The caller has no membership row (or an inactive account).
    NotAMember,
}

impl AccessReason {
    /// Whether this reason authorizes disclosure.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::UserIsHost | Self::UserIsActiveMember)
    }

    /// Stable reason code recorded in the audit log.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::RoomNotFound => "room_not_found".to_string(),
            Self::RoomInactive => "room_inactive".to_string(),
            Self::UserIsHost => "user_is_host".to_string(),
            Self::UserIsActiveMember => "user_is_active_member".to_string(),
            Self::MembershipStatus(status) => format!("membership_status_{}", status.as_str()),
            Self::NotAMember => "not_a_member".to_string(),
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessCheck {
    /// Whether exact-location disclosure is authorized.
    pub authorized: bool,
    /// Why.
    pub reason: AccessReason,
}

impl From<AccessReason> for AccessCheck {
    fn from(reason: AccessReason) -> Self {
        Self {
            authorized: reason.is_granted(),
            reason,
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Record id.
    pub id: i64,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
    /// Requesting user.
    pub user_id: UserId,
    /// Requested room (may not exist).
    pub room_id: RoomId,
    /// Whether access was granted.
    pub granted: bool,
    /// Reason code, see [`AccessReason::code`].
    pub reason: String,
}
