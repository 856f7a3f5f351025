//! Request-facing entry point.
//!
//! [`Roomgate`] wires the room directory, membership ledger, join-request
//! workflow and access guard over one shared [`Store`] and exposes every
//! operation a transport layer needs. Each method takes the caller's
//! [`Identity`] as supplied by the authentication layer.

use std::sync::Arc;

use crate::access::{AccessCheck, AccessDecision, AccessGuard};
use crate::clock::{Clock, SystemClock};
use crate::config::{RoomgateConfig, SearchConfig};
use crate::error::Result;
use crate::identity::Identity;
use crate::ids::{JoinRequestId, MembershipId, RoomId};
use crate::join_request::{JoinRequest, JoinRequestOutcome, JoinRequestProcess, JoinRequestUpdate};
use crate::location::{Coordinates, GeoPrivacy, GeocoderHandle};
use crate::membership::{Membership, MembershipLedger, WaitlistStanding, WaitlistView};
use crate::room::{
    CapacityInfo, NewRoom, PrivateRoom, Room, RoomDirectory, RoomListing, RoomSearch, RoomStatus,
    RoomUpdate,
};
use crate::storage::Store;

/// Core interface for Roomgate functionality.
///
/// # Examples
///
/// ```
/// use roomgate_core::{Identity, Roomgate, UserId};
/// use roomgate_core::room::NewRoom;
///
/// let gate = Roomgate::in_memory().unwrap();
/// let host = Identity::active(UserId::new(1));
/// let room = gate.create_room(&host, &NewRoom::named("Board games")).unwrap();
/// assert_eq!(gate.get_room(room.room.id).unwrap().name, "Board games");
/// ```
#[derive(Debug)]
pub struct Roomgate {
    store: Arc<Store>,
    rooms: RoomDirectory,
    members: MembershipLedger,
    requests: JoinRequestProcess,
    guard: AccessGuard,
}

/// Assembles a [`Roomgate`] from its collaborators.
///
/// Only the store is required; the clock defaults to the system clock, the
/// location randomness to the OS source and the geocoder to one that
/// resolves nothing.
#[derive(Debug)]
pub struct RoomgateBuilder {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    privacy: Arc<GeoPrivacy>,
    geocoder: GeocoderHandle,
    search: SearchConfig,
}

impl RoomgateBuilder {
    /// Starts a builder over `store`.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            privacy: Arc::new(GeoPrivacy::new()),
            geocoder: GeocoderHandle::default(),
            search: SearchConfig::default(),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the location randomness.
    #[must_use]
    pub fn privacy(mut self, privacy: GeoPrivacy) -> Self {
        self.privacy = Arc::new(privacy);
        self
    }

    /// Installs an address resolver.
    #[must_use]
    pub fn geocoder(mut self, geocoder: GeocoderHandle) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Replaces the search limits.
    #[must_use]
    pub fn search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Wires the components.
    #[must_use]
    pub fn build(self) -> Roomgate {
        let Self {
            store,
            clock,
            privacy,
            geocoder,
            search,
        } = self;

        Roomgate {
            rooms: RoomDirectory::new(
                Arc::clone(&store),
                privacy,
                geocoder,
                Arc::clone(&clock),
                search,
            ),
            members: MembershipLedger::new(Arc::clone(&store), Arc::clone(&clock)),
            requests: JoinRequestProcess::new(Arc::clone(&store), Arc::clone(&clock)),
            guard: AccessGuard::new(Arc::clone(&store), clock),
            store,
        }
    }
}

impl Roomgate {
    /// Starts a [`RoomgateBuilder`] over `store`.
    #[must_use]
    pub fn builder(store: Arc<Store>) -> RoomgateBuilder {
        RoomgateBuilder::new(store)
    }

    /// Opens the database named in `config` and wires every component.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open(config: &RoomgateConfig, geocoder: GeocoderHandle) -> Result<Self> {
        let store = Arc::new(Store::open(&config.store)?);
        tracing::info!(
            database = %config.store.database_path.display(),
            pool_size = config.store.pool_size,
            "Roomgate opened"
        );
        Ok(Self::builder(store)
            .geocoder(geocoder)
            .search(config.search.clone())
            .build())
    }

    /// An instance over a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        Ok(Self::builder(Arc::new(Store::in_memory()?)).build())
    }

    // ==================== Components ====================

    /// The shared store.
    #[must_use]
    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Room lifecycle and discovery.
    #[must_use]
    pub const fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }

    /// Membership and waitlist.
    #[must_use]
    pub const fn members(&self) -> &MembershipLedger {
        &self.members
    }

    /// Join-request workflow.
    #[must_use]
    pub const fn requests(&self) -> &JoinRequestProcess {
        &self.requests
    }

    /// Exact-location access control.
    #[must_use]
    pub const fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    // ==================== Rooms ====================

    /// Opens a room hosted by `actor`.
    ///
    /// # Errors
    ///
    /// See [`RoomDirectory::create_room`].
    pub fn create_room(&self, actor: &Identity, new: &NewRoom) -> Result<PrivateRoom> {
        self.rooms.create_room(actor, new)
    }

    /// Edits a room.
    ///
    /// # Errors
    ///
    /// See [`RoomDirectory::update_room`].
    pub fn update_room(
        &self,
        actor: &Identity,
        room_id: RoomId,
        update: &RoomUpdate,
    ) -> Result<PrivateRoom> {
        self.rooms.update_room(actor, room_id, update)
    }

    /// Replaces or clears the venue location.
    ///
    /// # Errors
    ///
    /// See [`RoomDirectory::update_location`].
    pub fn update_location(
        &self,
        actor: &Identity,
        room_id: RoomId,
        location: Option<Coordinates>,
    ) -> Result<PrivateRoom> {
        self.rooms.update_location(actor, room_id, location)
    }

    /// Moves a room along its status graph.
    ///
    /// # Errors
    ///
    /// See [`RoomDirectory::transition_status`].
    pub fn transition_status(
        &self,
        actor: &Identity,
        room_id: RoomId,
        target: RoomStatus,
    ) -> Result<Room> {
        self.rooms.transition_status(actor, room_id, target)
    }

    /// Soft-deletes a room.
    ///
    /// # Errors
    ///
    /// See [`RoomDirectory::delete_room`].
    pub fn delete_room(&self, actor: &Identity, room_id: RoomId) -> Result<()> {
        self.rooms.delete_room(actor, room_id)
    }

    /// Public view of a room.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing or deleted rooms.
    pub fn get_room(&self, room_id: RoomId) -> Result<Room> {
        self.rooms.get_room(room_id)
    }

    /// The room with its exact location and address, for authorized
    /// callers. Every call is audited.
    ///
    /// # Errors
    ///
    /// See [`AccessGuard::reveal_private_room`].
    pub fn get_private_room(&self, actor: &Identity, room_id: RoomId) -> Result<PrivateRoom> {
        self.guard.reveal_private_room(actor, room_id)
    }

    /// Whether `actor` may see the exact location. Audited.
    ///
    /// # Errors
    ///
    /// Only storage failures.
    pub fn check_access(&self, actor: &Identity, room_id: RoomId) -> Result<AccessCheck> {
        self.guard.check_private_location_access(actor, room_id)
    }

    /// Seats and active guests.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing or deleted rooms.
    pub fn capacity_info(&self, room_id: RoomId) -> Result<CapacityInfo> {
        self.rooms.capacity_info(room_id)
    }

    /// Discovery search.
    ///
    /// # Errors
    ///
    /// See [`RoomDirectory::search`].
    pub fn search(&self, query: &RoomSearch) -> Result<Vec<RoomListing>> {
        self.rooms.search(query)
    }

    /// Access decisions recorded for a room.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn audit_log(&self, room_id: RoomId) -> Result<Vec<AccessDecision>> {
        self.guard.decisions_for_room(room_id)
    }

    // ==================== Join Requests ====================

    /// Asks the host for a seat.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::submit`].
    pub fn submit_join_request(
        &self,
        actor: &Identity,
        room_id: RoomId,
        message: Option<&str>,
    ) -> Result<JoinRequest> {
        self.requests.submit(actor, room_id, message)
    }

    /// Decides on or edits a pending request.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::update`].
    pub fn update_join_request(
        &self,
        actor: &Identity,
        request_id: JoinRequestId,
        update: &JoinRequestUpdate,
    ) -> Result<JoinRequestOutcome> {
        self.requests.update(actor, request_id, update)
    }

    /// Withdraws a pending request.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::cancel`].
    pub fn cancel_join_request(
        &self,
        actor: &Identity,
        request_id: JoinRequestId,
    ) -> Result<JoinRequest> {
        self.requests.cancel(actor, request_id)
    }

    /// A single request.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::get`].
    pub fn get_join_request(
        &self,
        actor: &Identity,
        request_id: JoinRequestId,
    ) -> Result<JoinRequest> {
        self.requests.get(actor, request_id)
    }

    /// Requests for a room, as visible to `actor`.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::list_for_room`].
    pub fn list_join_requests(&self, actor: &Identity, room_id: RoomId) -> Result<Vec<JoinRequest>> {
        self.requests.list_for_room(actor, room_id)
    }

    /// Requests `actor` has submitted.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::list_mine`].
    pub fn my_join_requests(&self, actor: &Identity) -> Result<Vec<JoinRequest>> {
        self.requests.list_mine(actor)
    }

    // ==================== Membership ====================

    /// Leaves a room or its waitlist.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::leave`].
    pub fn leave(&self, actor: &Identity, room_id: RoomId) -> Result<Membership> {
        self.members.leave(actor, room_id)
    }

    /// Removes a member.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::kick`].
    pub fn kick(
        &self,
        actor: &Identity,
        room_id: RoomId,
        member_id: MembershipId,
    ) -> Result<Membership> {
        self.members.kick(actor, room_id, member_id)
    }

    /// Current members, host first.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::list_members`].
    pub fn list_members(&self, actor: &Identity, room_id: RoomId) -> Result<Vec<Membership>> {
        self.members.list_members(actor, room_id)
    }

    /// The waitlist in queue order.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::list_waitlist`].
    pub fn list_waitlist(&self, actor: &Identity, room_id: RoomId) -> Result<WaitlistView> {
        self.members.list_waitlist(actor, room_id)
    }

    /// Promotes the head of the waitlist.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::promote`].
    pub fn promote(
        &self,
        actor: &Identity,
        room_id: RoomId,
        member_id: MembershipId,
    ) -> Result<Membership> {
        self.members.promote(actor, room_id, member_id)
    }

    /// Drops a waitlist entry.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::remove_from_waitlist`].
    pub fn remove_from_waitlist(
        &self,
        actor: &Identity,
        room_id: RoomId,
        member_id: MembershipId,
    ) -> Result<Membership> {
        self.members.remove_from_waitlist(actor, room_id, member_id)
    }

    /// The caller's own waitlist position.
    ///
    /// # Errors
    ///
    /// See [`MembershipLedger::waitlist_position`].
    pub fn waitlist_position(&self, actor: &Identity, room_id: RoomId) -> Result<WaitlistStanding> {
        self.members.waitlist_position(actor, room_id)
    }
}
