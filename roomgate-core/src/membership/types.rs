//! Membership types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MembershipId, RoomId, UserId};
use crate::room::CapacityInfo;

/// Status of a user's membership row in a room.
///
/// `Active` and `Waitlisted` are current occupancy. `Left`, `Removed` and
/// `Kicked` are terminal for the current stay but the row can be reactivated
/// by a later approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Holds a seat.
    Active,
    /// Queued for a seat.
    Waitlisted,
    /// Left voluntarily.
    Left,
    /// Taken off the waitlist by the host.
    Removed,
    /// Removed from the room by the host.
    Kicked,
}

impl MembershipStatus {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waitlisted => "waitlisted",
            Self::Left => "left",
            Self::Removed => "removed",
            Self::Kicked => "kicked",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "waitlisted" => Some(Self::Waitlisted),
            "left" => Some(Self::Left),
            "removed" => Some(Self::Removed),
            "kicked" => Some(Self::Kicked),
            _ => None,
        }
    }

    /// Whether the row represents a current occupant.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        matches!(self, Self::Active | Self::Waitlisted)
    }
}

/// A user's membership row in a room.
///
/// At most one row exists per `(user_id, room_id)`; it is reused across
/// leave/rejoin cycles and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Row id.
    pub id: MembershipId,
    /// Room.
    pub room_id: RoomId,
    /// Member.
    pub user_id: UserId,
    /// Whether this row belongs to the room's host.
    pub is_host: bool,
    /// Current status.
    pub status: MembershipStatus,
    /// Position in the waitlist (1 = next); present iff `Waitlisted`.
    pub queue_position: Option<u32>,
    /// When the current stay began (fresh on every admission or promotion).
    pub joined_at: DateTime<Utc>,
    /// When the last stay ended; cleared on reactivation.
    pub left_at: Option<DateTime<Utc>>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// The host's view of a room's waitlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistView {
    /// Seat accounting.
    pub capacity: CapacityInfo,
    /// Waitlisted rows ordered by position.
    pub entries: Vec<Membership>,
}

/// A member's own place in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistStanding {
    /// 1-based position.
    pub position: u32,
    /// Total entries in the waitlist.
    pub waitlist_length: u32,
}
