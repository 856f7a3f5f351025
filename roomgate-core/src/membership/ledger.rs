//! The membership and waitlist state machine.
//!
//! Every mutation runs under the room's lock inside one `IMMEDIATE`
//! transaction, so capacity checks, queue numbering and the write they
//! justify are atomic with respect to every other mutation of that room.
//!
//! # Waitlist invariant
//!
//! The waitlisted rows of a room always carry positions `1..=N` with no
//! gaps and no duplicates. Appends take `max + 1`; every departure from the
//! queue is followed by [`memberships::close_gap`] in the same transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::types::{Membership, MembershipStatus, WaitlistStanding, WaitlistView};
use crate::clock::Clock;
use crate::error::{Result, RoomgateError};
use crate::identity::Identity;
use crate::ids::{MembershipId, RoomId, UserId};
use crate::room::directory::{capacity_info, load_live_room, require_host, require_open};
use crate::storage::rooms::RoomRecord;
use crate::storage::{memberships, Store};

/// Authoritative record of who occupies or waits for a room's seats.
pub struct MembershipLedger {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl MembershipLedger {
    /// Creates a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // ==================== Transitions ====================

    /// Places an approved user in the room: active if a seat is free,
    /// otherwise at the end of the waitlist.
    ///
    /// A previous terminal row (left, removed, kicked) is reactivated rather
    /// than duplicated.
    ///
    /// No caller identity is checked here: the approval must already have
    /// happened. Request-facing code admits through
    /// [`JoinRequestProcess`](crate::join_request::JoinRequestProcess).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing room, `InvalidState` for a finished
    /// or cancelled room, `Conflict` if the user is already a current
    /// occupant, or `Busy`.
    pub fn admit(&self, room_id: RoomId, user_id: UserId) -> Result<Membership> {
        let now = self.clock.now();
        self.store.write_room(room_id, |conn| {
            let record = load_live_room(conn, room_id)?;
            admit_in(conn, &record, user_id, now)
        })
    }

    /// The caller leaves the room.
    ///
    /// Leaving from the waitlist closes the gap behind the vacated position;
    /// leaving an active seat leaves the queue untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the caller has no row, `Forbidden` for the host
    /// or an inactive account, `InvalidState` if the row is not current, or
    /// `Busy`.
    pub fn leave(&self, actor: &Identity, room_id: RoomId) -> Result<Membership> {
        let user_id = actor.require_active()?;
        let now = self.clock.now();

        let membership = self.store.write_room(room_id, |conn| {
            load_live_room(conn, room_id)?;
            let membership = memberships::find_membership(conn, room_id, user_id)?
                .ok_or_else(|| RoomgateError::NotFound("Not a member of this room".to_string()))?;
            if membership.is_host {
                return Err(RoomgateError::Forbidden(
                    "The host cannot leave their own room".to_string(),
                ));
            }
            depart(conn, membership, MembershipStatus::Left, now)
        })?;

        tracing::info!(room_id = %room_id, user_id = %user_id, "Member left room");
        Ok(membership)
    }

    /// The host removes a current occupant from the room.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row does not belong to the room, `Forbidden`
    /// for non-hosts or when targeting the host row, `InvalidState` if the
    /// row is not current, or `Busy`.
    pub fn kick(
        &self,
        actor: &Identity,
        room_id: RoomId,
        member_id: MembershipId,
    ) -> Result<Membership> {
        let host_id = actor.require_active()?;
        let now = self.clock.now();

        let result = self.store.write_room(room_id, |conn| {
            let record = load_live_room(conn, room_id)?;
            require_host(&record.room, host_id)?;
            let target = load_member(conn, room_id, member_id)?;
            if target.is_host {
                return Err(RoomgateError::Forbidden(
                    "The host cannot be kicked".to_string(),
                ));
            }
            depart(conn, target, MembershipStatus::Kicked, now)
        });

        log_host_action(&result, room_id, host_id, "Member kicked");
        result
    }

    /// The host promotes the head of the waitlist into a free seat.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the target is waitlisted at position 1
    /// and a seat is free (or the room is closed); `Forbidden` for non-hosts;
    /// `NotFound` if the row does not belong to the room; or `Busy`.
    pub fn promote(
        &self,
        actor: &Identity,
        room_id: RoomId,
        member_id: MembershipId,
    ) -> Result<Membership> {
        let host_id = actor.require_active()?;
        let now = self.clock.now();

        let result = self.store.write_room(room_id, |conn| {
            let record = load_live_room(conn, room_id)?;
            require_host(&record.room, host_id)?;
            require_open(&record.room)?;

            let mut target = load_member(conn, room_id, member_id)?;
            match (target.status, target.queue_position) {
                (MembershipStatus::Waitlisted, Some(1)) => {}
                (MembershipStatus::Waitlisted, _) => {
                    return Err(RoomgateError::InvalidState(
                        "Only the first member in the waitlist can be promoted".to_string(),
                    ));
                }
                _ => {
                    return Err(RoomgateError::InvalidState(
                        "Member is not on the waitlist".to_string(),
                    ));
                }
            }
            if !capacity_info(conn, &record.room)?.has_free_slot() {
                return Err(RoomgateError::InvalidState("Room is full".to_string()));
            }

            target.status = MembershipStatus::Active;
            target.queue_position = None;
            target.joined_at = now;
            target.left_at = None;
            target.updated_at = now;
            memberships::save_membership(conn, &target)?;
            memberships::close_gap(conn, room_id, 1, now)?;
            Ok(target)
        });

        log_host_action(&result, room_id, host_id, "Waitlisted member promoted");
        result
    }

    /// The host takes an entry off the waitlist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the target is not waitlisted, `Forbidden`
    /// for non-hosts, `NotFound` if the row does not belong to the room, or
    /// `Busy`.
    pub fn remove_from_waitlist(
        &self,
        actor: &Identity,
        room_id: RoomId,
        member_id: MembershipId,
    ) -> Result<Membership> {
        let host_id = actor.require_active()?;
        let now = self.clock.now();

        let result = self.store.write_room(room_id, |conn| {
            let record = load_live_room(conn, room_id)?;
            require_host(&record.room, host_id)?;
            let target = load_member(conn, room_id, member_id)?;
            if target.status != MembershipStatus::Waitlisted {
                return Err(RoomgateError::InvalidState(
                    "Member is not on the waitlist".to_string(),
                ));
            }
            depart(conn, target, MembershipStatus::Removed, now)
        });

        log_host_action(&result, room_id, host_id, "Member removed from waitlist");
        result
    }

    // ==================== Queries ====================

    /// The waitlist in queue order together with seat accounting. Host only.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub fn list_waitlist(&self, actor: &Identity, room_id: RoomId) -> Result<WaitlistView> {
        let host_id = actor.require_active()?;
        self.store.read(|conn| {
            let record = load_live_room(conn, room_id)?;
            require_host(&record.room, host_id)?;
            Ok(WaitlistView {
                capacity: capacity_info(conn, &record.room)?,
                entries: memberships::list_by_status(
                    conn,
                    room_id,
                    MembershipStatus::Waitlisted,
                )?,
            })
        })
    }

    /// The caller's own place in the waitlist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the room is missing or the caller is not
    /// waitlisted.
    pub fn waitlist_position(&self, actor: &Identity, room_id: RoomId) -> Result<WaitlistStanding> {
        let user_id = actor.require_active()?;
        self.store.read(|conn| {
            load_live_room(conn, room_id)?;
            let position = memberships::find_membership(conn, room_id, user_id)?
                .filter(|m| m.status == MembershipStatus::Waitlisted)
                .and_then(|m| m.queue_position)
                .ok_or_else(|| RoomgateError::NotFound("Not on the waitlist".to_string()))?;
            Ok(WaitlistStanding {
                position,
                waitlist_length: memberships::max_queue_position(conn, room_id)?,
            })
        })
    }

    /// Current active occupants, host first. Visible to the host and to
    /// active members.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub fn list_members(&self, actor: &Identity, room_id: RoomId) -> Result<Vec<Membership>> {
        let user_id = actor.require_active()?;
        self.store.read(|conn| {
            let record = load_live_room(conn, room_id)?;
            if record.room.host_id != user_id {
                let own = memberships::find_membership(conn, room_id, user_id)?;
                if !own.is_some_and(|m| m.status == MembershipStatus::Active) {
                    return Err(RoomgateError::Forbidden(
                        "Only members can view the member list".to_string(),
                    ));
                }
            }
            memberships::list_by_status(conn, room_id, MembershipStatus::Active)
        })
    }

    /// A user's row in a room, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn membership_of(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Membership>> {
        self.store
            .read(|conn| memberships::find_membership(conn, room_id, user_id))
    }
}

impl std::fmt::Debug for MembershipLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipLedger").finish_non_exhaustive()
    }
}

/// Admission inside an existing transaction that already holds the room
/// lock. Shared with join-request approval so both commit together.
pub(crate) fn admit_in(
    conn: &Connection,
    record: &RoomRecord,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<Membership> {
    let room = &record.room;
    require_open(room)?;
    if room.host_id == user_id {
        return Err(RoomgateError::Conflict(
            "The host is already a member".to_string(),
        ));
    }

    let existing = memberships::find_membership(conn, room.id, user_id)?;
    if existing.as_ref().is_some_and(|m| m.status.is_current()) {
        return Err(RoomgateError::Conflict(
            "User is already a member of this room".to_string(),
        ));
    }

    let (status, queue_position) = if capacity_info(conn, room)?.has_free_slot() {
        (MembershipStatus::Active, None)
    } else {
        let next = memberships::max_queue_position(conn, room.id)? + 1;
        (MembershipStatus::Waitlisted, Some(next))
    };

    let membership = match existing {
        Some(mut row) => {
            row.status = status;
            row.queue_position = queue_position;
            row.joined_at = now;
            row.left_at = None;
            row.updated_at = now;
            memberships::save_membership(conn, &row)?;
            row
        }
        None => memberships::insert_membership(
            conn,
            room.id,
            user_id,
            false,
            status,
            queue_position,
            now,
        )?,
    };

    tracing::info!(
        room_id = %room.id,
        user_id = %user_id,
        status = membership.status.as_str(),
        queue_position = membership.queue_position,
        "Member admitted"
    );
    Ok(membership)
}

/// Ends a current stay with `status`, closing the waitlist gap if needed.
fn depart(
    conn: &Connection,
    mut membership: Membership,
    status: MembershipStatus,
    now: DateTime<Utc>,
) -> Result<Membership> {
    if !membership.status.is_current() {
        return Err(RoomgateError::InvalidState(format!(
            "Membership is already {}",
            membership.status.as_str()
        )));
    }

    let vacated = membership.queue_position.take();
    membership.status = status;
    membership.left_at = Some(now);
    membership.updated_at = now;
    memberships::save_membership(conn, &membership)?;

    if let Some(position) = vacated {
        memberships::close_gap(conn, membership.room_id, position, now)?;
    }
    Ok(membership)
}

/// Loads a membership row and checks it belongs to `room_id`.
fn load_member(conn: &Connection, room_id: RoomId, member_id: MembershipId) -> Result<Membership> {
    memberships::get_membership(conn, member_id)?
        .filter(|m| m.room_id == room_id)
        .ok_or_else(|| RoomgateError::NotFound("Member not found".to_string()))
}

fn log_host_action(result: &Result<Membership>, room_id: RoomId, host_id: UserId, action: &str) {
    match result {
        Ok(m) => tracing::info!(
            room_id = %room_id,
            user_id = %host_id,
            member_id = %m.id,
            "{action}"
        ),
        Err(e) => tracing::warn!(
            room_id = %room_id,
            user_id = %host_id,
            error = %e,
            "{action}: rejected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::SearchConfig;
    use crate::location::{GeoPrivacy, GeocoderHandle};
    use crate::room::{NewRoom, RoomDirectory};

    struct Fixture {
        rooms: RoomDirectory,
        ledger: MembershipLedger,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(Store::in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Fixture {
            rooms: RoomDirectory::new(
                Arc::clone(&store),
                Arc::new(GeoPrivacy::seeded(1)),
                GeocoderHandle::default(),
                Arc::clone(&clock),
                SearchConfig::default(),
            ),
            ledger: MembershipLedger::new(store, clock),
        }
    }

    fn host() -> Identity {
        Identity::active(UserId::new(1))
    }

    fn user(id: i64) -> Identity {
        Identity::active(UserId::new(id))
    }

    fn room(f: &Fixture, capacity: Option<u32>) -> RoomId {
        let mut new = NewRoom::named("Poker");
        new.capacity = capacity;
        f.rooms.create_room(&host(), &new).unwrap().room.id
    }

    fn queue(f: &Fixture, room: RoomId) -> Vec<(i64, u32)> {
        f.ledger
            .list_waitlist(&host(), room)
            .unwrap()
            .entries
            .into_iter()
            .map(|m| (m.user_id.get(), m.queue_position.unwrap()))
            .collect()
    }

    #[test]
    fn unlimited_room_admits_everyone() {
        let f = fixture();
        let room = room(&f, None);
        for id in 2..10 {
            let m = f.ledger.admit(room, UserId::new(id)).unwrap();
            assert_eq!(m.status, MembershipStatus::Active);
        }
    }

    #[test]
    fn full_room_waitlists_in_order() {
        let f = fixture();
        let room = room(&f, Some(1));
        assert_eq!(
            f.ledger.admit(room, UserId::new(2)).unwrap().status,
            MembershipStatus::Active
        );
        let b = f.ledger.admit(room, UserId::new(3)).unwrap();
        let c = f.ledger.admit(room, UserId::new(4)).unwrap();
        assert_eq!(b.queue_position, Some(1));
        assert_eq!(c.queue_position, Some(2));
    }

    #[test]
    fn admitting_current_member_conflicts() {
        let f = fixture();
        let room = room(&f, None);
        f.ledger.admit(room, UserId::new(2)).unwrap();
        assert!(matches!(
            f.ledger.admit(room, UserId::new(2)),
            Err(RoomgateError::Conflict(_))
        ));
        assert!(matches!(
            f.ledger.admit(room, UserId::new(1)),
            Err(RoomgateError::Conflict(_))
        ));
    }

    #[test]
    fn rejoin_reuses_row() {
        let f = fixture();
        let room = room(&f, None);
        let first = f.ledger.admit(room, UserId::new(2)).unwrap();
        let left = f.ledger.leave(&user(2), room).unwrap();
        assert_eq!(left.status, MembershipStatus::Left);
        assert!(left.left_at.is_some());

        let again = f.ledger.admit(room, UserId::new(2)).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.status, MembershipStatus::Active);
        assert!(again.left_at.is_none());
    }

    #[test]
    fn leaving_waitlist_closes_gap() {
        let f = fixture();
        let room = room(&f, Some(1));
        f.ledger.admit(room, UserId::new(2)).unwrap();
        for id in 3..=5 {
            f.ledger.admit(room, UserId::new(id)).unwrap();
        }
        f.ledger.leave(&user(4), room).unwrap();
        assert_eq!(queue(&f, room), vec![(3, 1), (5, 2)]);
    }

    #[test]
    fn host_cannot_leave() {
        let f = fixture();
        let room = room(&f, None);
        assert!(matches!(
            f.ledger.leave(&host(), room),
            Err(RoomgateError::Forbidden(_))
        ));
    }

    #[test]
    fn leaving_twice_is_invalid() {
        let f = fixture();
        let room = room(&f, None);
        f.ledger.admit(room, UserId::new(2)).unwrap();
        f.ledger.leave(&user(2), room).unwrap();
        assert!(matches!(
            f.ledger.leave(&user(2), room),
            Err(RoomgateError::InvalidState(_))
        ));
        assert!(matches!(
            f.ledger.leave(&user(9), room),
            Err(RoomgateError::NotFound(_))
        ));
    }

    #[test]
    fn kick_rules() {
        let f = fixture();
        let room = room(&f, None);
        let member = f.ledger.admit(room, UserId::new(2)).unwrap();
        let host_row = f.ledger.membership_of(room, UserId::new(1)).unwrap().unwrap();

        assert!(matches!(
            f.ledger.kick(&user(3), room, member.id),
            Err(RoomgateError::Forbidden(_))
        ));
        assert!(matches!(
            f.ledger.kick(&host(), room, host_row.id),
            Err(RoomgateError::Forbidden(_))
        ));

        let kicked = f.ledger.kick(&host(), room, member.id).unwrap();
        assert_eq!(kicked.status, MembershipStatus::Kicked);
        assert!(matches!(
            f.ledger.kick(&host(), room, member.id),
            Err(RoomgateError::InvalidState(_))
        ));
    }

    #[test]
    fn member_of_other_room_is_not_found() {
        let f = fixture();
        let a = room(&f, None);
        let b = room(&f, None);
        let member = f.ledger.admit(a, UserId::new(2)).unwrap();
        assert!(matches!(
            f.ledger.kick(&host(), b, member.id),
            Err(RoomgateError::NotFound(_))
        ));
    }

    #[test]
    fn promote_requires_head_and_free_seat() {
        let f = fixture();
        let room = room(&f, Some(1));
        f.ledger.admit(room, UserId::new(2)).unwrap();
        let first = f.ledger.admit(room, UserId::new(3)).unwrap();
        let second = f.ledger.admit(room, UserId::new(4)).unwrap();

        assert!(matches!(
            f.ledger.promote(&host(), room, first.id),
            Err(RoomgateError::InvalidState(_))
        ));
        assert!(matches!(
            f.ledger.promote(&host(), room, second.id),
            Err(RoomgateError::InvalidState(_))
        ));

        f.ledger.leave(&user(2), room).unwrap();
        let promoted = f.ledger.promote(&host(), room, first.id).unwrap();
        assert_eq!(promoted.status, MembershipStatus::Active);
        assert_eq!(promoted.queue_position, None);
        assert_eq!(queue(&f, room), vec![(4, 1)]);
    }

    #[test]
    fn promote_rejects_active_member() {
        let f = fixture();
        let room = room(&f, None);
        let member = f.ledger.admit(room, UserId::new(2)).unwrap();
        assert!(matches!(
            f.ledger.promote(&host(), room, member.id),
            Err(RoomgateError::InvalidState(_))
        ));
    }

    #[test]
    fn remove_from_waitlist_renumbers() {
        let f = fixture();
        let room = room(&f, Some(1));
        f.ledger.admit(room, UserId::new(2)).unwrap();
        f.ledger.admit(room, UserId::new(3)).unwrap();
        let middle = f.ledger.admit(room, UserId::new(4)).unwrap();
        f.ledger.admit(room, UserId::new(5)).unwrap();

        let removed = f.ledger.remove_from_waitlist(&host(), room, middle.id).unwrap();
        assert_eq!(removed.status, MembershipStatus::Removed);
        assert!(removed.left_at.is_some());
        assert_eq!(queue(&f, room), vec![(3, 1), (5, 2)]);
    }

    #[test]
    fn waitlist_position_for_self() {
        let f = fixture();
        let room = room(&f, Some(1));
        f.ledger.admit(room, UserId::new(2)).unwrap();
        f.ledger.admit(room, UserId::new(3)).unwrap();
        f.ledger.admit(room, UserId::new(4)).unwrap();

        let standing = f.ledger.waitlist_position(&user(4), room).unwrap();
        assert_eq!(standing.position, 2);
        assert_eq!(standing.waitlist_length, 2);
        assert!(matches!(
            f.ledger.waitlist_position(&user(2), room),
            Err(RoomgateError::NotFound(_))
        ));
    }

    #[test]
    fn waitlist_is_host_only() {
        let f = fixture();
        let room = room(&f, Some(1));
        assert!(matches!(
            f.ledger.list_waitlist(&user(2), room),
            Err(RoomgateError::Forbidden(_))
        ));
    }

    #[test]
    fn member_list_visibility() {
        let f = fixture();
        let room = room(&f, Some(1));
        f.ledger.admit(room, UserId::new(2)).unwrap();
        f.ledger.admit(room, UserId::new(3)).unwrap();

        let members = f.ledger.list_members(&user(2), room).unwrap();
        let ids: Vec<i64> = members.iter().map(|m| m.user_id.get()).collect();
        assert_eq!(ids, vec![1, 2]);

        assert!(f.ledger.list_members(&host(), room).is_ok());
        assert!(matches!(
            f.ledger.list_members(&user(3), room),
            Err(RoomgateError::Forbidden(_))
        ));
    }

    #[test]
    fn lowered_capacity_waitlists_new_admissions() {
        let f = fixture();
        let room = room(&f, None);
        f.ledger.admit(room, UserId::new(2)).unwrap();
        f.ledger.admit(room, UserId::new(3)).unwrap();

        let update = crate::room::RoomUpdate {
            capacity: Some(Some(1)),
            ..crate::room::RoomUpdate::default()
        };
        f.rooms.update_room(&host(), room, &update).unwrap();

        let info = f.rooms.capacity_info(room).unwrap();
        assert_eq!(info.active_count, 2);
        let late = f.ledger.admit(room, UserId::new(4)).unwrap();
        assert_eq!(late.status, MembershipStatus::Waitlisted);
    }

    #[test]
    fn closed_room_rejects_admission() {
        let f = fixture();
        let room = room(&f, None);
        f.rooms
            .transition_status(&host(), room, crate::room::RoomStatus::Cancelled)
            .unwrap();
        assert!(matches!(
            f.ledger.admit(room, UserId::new(2)),
            Err(RoomgateError::InvalidState(_))
        ));
    }
}
