//! Rooms: records, status lifecycle and discovery search.

pub mod directory;
pub mod types;

pub use directory::RoomDirectory;
pub use types::{
    CapacityInfo, NewRoom, PrivateRoom, Room, RoomListing, RoomSearch, RoomStatus, RoomUpdate,
    SearchOrigin,
};
