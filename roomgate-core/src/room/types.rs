//! Room types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomgateError};
use crate::ids::{RoomId, UserId};
use crate::location::Coordinates;

/// Longest room name accepted, in characters.
pub const MAX_NAME_CHARS: usize = 120;

/// Lifecycle status of a room.
///
/// `Scheduled → {Active, Cancelled}`, `Active → {Finished, Cancelled}`.
/// `Finished` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Created, not yet started.
    Scheduled,
    /// In progress.
    Active,
    /// Ended normally.
    Finished,
    /// Called off.
    Cancelled,
}

impl RoomStatus {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "active" => Some(Self::Active),
            "finished" => Some(Self::Finished),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Whether the status graph has an edge from `self` to `target`.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Scheduled, Self::Active | Self::Cancelled)
                | (Self::Active, Self::Finished | Self::Cancelled)
        )
    }

    /// Statuses listed by discovery when the caller gives none.
    #[must_use]
    pub fn discoverable() -> Vec<Self> {
        vec![Self::Scheduled, Self::Active]
    }
}

/// A room as visible to anyone: the exact location and address are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room id.
    pub id: RoomId,
    /// The user who opened the room.
    pub host_id: UserId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: RoomStatus,
    /// Guest seats; `None` means unlimited.
    pub capacity: Option<u32>,
    /// Planned start.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Randomized point 200-500 m from the venue.
    pub public_location: Option<Coordinates>,
    /// `false` once the host deleted the room.
    pub is_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// When the room entered `Finished`.
    pub finished_at: Option<DateTime<Utc>>,
}

/// A room together with its private venue details.
///
/// Only produced for callers cleared by the access guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateRoom {
    /// The public view.
    #[serde(flatten)]
    pub room: Room,
    /// Exact venue coordinates.
    pub exact_location: Option<Coordinates>,
    /// Venue street address.
    pub address: Option<String>,
}

/// Fields supplied when opening a room.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRoom {
    /// Display name (1-120 characters).
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Venue street address (private).
    pub address: Option<String>,
    /// Guest seats; `None` means unlimited.
    pub capacity: Option<u32>,
    /// Planned start.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Exact venue coordinates.
    pub location: Option<Coordinates>,
}

impl NewRoom {
    /// Creates a room draft with just a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the venue coordinates.
    #[must_use]
    pub fn with_location(mut self, location: Coordinates) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the guest capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the planned start.
    #[must_use]
    pub fn scheduled_at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// Sets the private address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_capacity(self.capacity)
    }
}

/// A partial edit of a room. `None` leaves a field unchanged; for optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New address.
    pub address: Option<Option<String>>,
    /// New capacity.
    pub capacity: Option<Option<u32>>,
    /// New planned start.
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    /// New venue coordinates.
    pub location: Option<Option<Coordinates>>,
}

impl RoomUpdate {
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        Ok(())
    }
}

/// Seat accounting for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityInfo {
    /// Guest seats; `None` means unlimited.
    pub capacity: Option<u32>,
    /// Guests currently `Active` (the host is not counted).
    pub active_count: u32,
}

impl CapacityInfo {
    /// Whether one more guest may become active.
    #[must_use]
    pub fn has_free_slot(&self) -> bool {
        self.capacity.map_or(true, |cap| self.active_count < cap)
    }
}

/// Where a discovery search is centred.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOrigin {
    /// Explicit coordinates.
    Point(Coordinates),
    /// Free-text address, resolved through the geocoder.
    Address(String),
}

/// Discovery search parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomSearch {
    /// Centre of the search; `None` lists rooms by start time.
    pub origin: Option<SearchOrigin>,
    /// Radius around the origin; defaulted and capped by configuration.
    pub radius_meters: Option<f64>,
    /// Statuses to include; defaults to scheduled and active.
    pub statuses: Option<Vec<RoomStatus>>,
    /// Results to skip.
    pub skip: u32,
    /// Page size; defaulted and capped by configuration.
    pub limit: Option<u32>,
}

impl RoomSearch {
    /// Search around a point.
    #[must_use]
    pub fn near(origin: Coordinates) -> Self {
        Self {
            origin: Some(SearchOrigin::Point(origin)),
            ..Self::default()
        }
    }

    /// Search around an address.
    #[must_use]
    pub fn near_address(address: impl Into<String>) -> Self {
        Self {
            origin: Some(SearchOrigin::Address(address.into())),
            ..Self::default()
        }
    }

    /// Sets the radius.
    #[must_use]
    pub fn within(mut self, meters: f64) -> Self {
        self.radius_meters = Some(meters);
        self
    }

    /// Sets the page window.
    #[must_use]
    pub fn page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// One discovery result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomListing {
    /// The room (public view).
    pub room: Room,
    /// Fuzzed distance to the public location; `None` without an origin.
    pub distance_meters: Option<f64>,
}

fn validate_name(name: &str) -> Result<()> {
    let length = name.trim().chars().count();
    if length == 0 || length > MAX_NAME_CHARS {
        return Err(RoomgateError::Validation(format!(
            "Room name must be between 1 and {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_capacity(capacity: Option<u32>) -> Result<()> {
    if capacity == Some(0) {
        return Err(RoomgateError::Validation(
            "Capacity must be at least 1".to_string(),
        ));
    }
    Ok(())
}
