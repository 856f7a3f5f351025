//! Shared fixtures for integration tests.
//!
//! [`TestGate`] wires a [`Roomgate`] over either an in-memory store or a
//! `SQLite` file in a temporary directory, with a manual clock and a seeded
//! location source so runs are reproducible.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use roomgate_core::clock::{Clock, ManualClock};
use roomgate_core::config::StoreConfig;
use roomgate_core::join_request::JoinRequestUpdate;
use roomgate_core::location::{Coordinates, GeoPrivacy, GeocoderHandle};
use roomgate_core::membership::Membership;
use roomgate_core::room::NewRoom;
use roomgate_core::storage::Store;
use roomgate_core::{Identity, RoomId, Roomgate, RoomgateError, UserId};
use tempfile::TempDir;

/// User id of the host in every fixture.
pub const HOST: i64 = 1;

/// A wired instance plus the handles tests need to steer it.
pub struct TestGate {
    pub gate: Roomgate,
    pub clock: Arc<ManualClock>,
    // Keeps the database directory alive for file-backed fixtures.
    _dir: Option<TempDir>,
}

/// Fixed starting instant for the manual clock.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()
}

/// In-memory fixture.
pub fn memory_gate() -> TestGate {
    let store = Arc::new(Store::in_memory().expect("in-memory store"));
    wire(store, None, GeocoderHandle::default())
}

/// In-memory fixture with an address resolver.
pub fn memory_gate_with_geocoder(geocoder: GeocoderHandle) -> TestGate {
    let store = Arc::new(Store::in_memory().expect("in-memory store"));
    wire(store, None, geocoder)
}

/// File-backed fixture with a pool large enough for concurrent callers.
pub fn file_gate(pool_size: u32) -> TestGate {
    let dir = TempDir::new().expect("temp dir");
    let config = StoreConfig {
        database_path: dir.path().join("roomgate.db"),
        pool_size,
        ..StoreConfig::default()
    };
    let store = Arc::new(Store::open(&config).expect("file store"));
    wire(store, Some(dir), GeocoderHandle::default())
}

fn wire(store: Arc<Store>, dir: Option<TempDir>, geocoder: GeocoderHandle) -> TestGate {
    let clock = Arc::new(ManualClock::new(epoch()));
    let shared: Arc<dyn Clock> = clock.clone();
    let gate = Roomgate::builder(store)
        .clock(shared)
        .privacy(GeoPrivacy::seeded(0x5eed))
        .geocoder(geocoder)
        .build();
    TestGate {
        gate,
        clock,
        _dir: dir,
    }
}

/// The host identity.
pub fn host() -> Identity {
    Identity::active(UserId::new(HOST))
}

/// An active guest identity.
pub fn guest(id: i64) -> Identity {
    Identity::active(UserId::new(id))
}

/// A venue in central Berlin.
pub fn venue() -> Coordinates {
    Coordinates::new(52.520_008, 13.404_954).expect("valid venue")
}

/// Opens a located room hosted by [`HOST`].
pub fn located_room(gate: &Roomgate, name: &str, capacity: Option<u32>) -> RoomId {
    let mut new = NewRoom::named(name)
        .with_location(venue())
        .with_address("Karl-Liebknecht-Str. 1");
    new.capacity = capacity;
    gate.create_room(&host(), &new).expect("room created").room.id
}

/// Seats `user` the only way a caller can: a join request approved by the
/// host. Lands on the waitlist when the room is full.
pub fn join(gate: &Roomgate, room: RoomId, user: i64) -> roomgate_core::Result<Membership> {
    let request = gate.submit_join_request(&guest(user), room, None)?;
    gate.update_join_request(&host(), request.id, &JoinRequestUpdate::approve())?
        .membership
        .ok_or_else(|| RoomgateError::InvalidState("Approval admitted nobody".to_string()))
}
