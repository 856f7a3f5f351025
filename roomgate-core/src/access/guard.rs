//! Exact-location authorization with an append-only audit trail.
//!
//! Every call to [`AccessGuard::check_private_location_access`] or
//! [`AccessGuard::reveal_private_room`] writes exactly one
//! [`AccessDecision`] row, and that row is committed before the caller
//! sees the outcome. Denials are committed too; the error is produced only
//! after the transaction holding the audit record has been committed.

use std::sync::Arc;

use rusqlite::Connection;

use super::types::{AccessCheck, AccessDecision, AccessReason};
use crate::clock::Clock;
use crate::error::{Result, RoomgateError};
use crate::identity::Identity;
use crate::ids::RoomId;
use crate::logging::AUDIT_TARGET;
use crate::membership::MembershipStatus;
use crate::room::PrivateRoom;
use crate::storage::rooms::{self, RoomRecord};
use crate::storage::{audit, memberships, Store};

/// Decides who may see a room's exact location.
pub struct AccessGuard {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl AccessGuard {
    /// Creates a guard over `store`.
    #[must_use]
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Decides and audits whether `actor` may see `room_id`'s exact location.
    ///
    /// Decision order: the room must exist and not be deleted; the host is
    /// authorized; an active member is authorized; any other membership row
    /// is denied with its status; everyone else is denied as not a member.
    /// An inactive account is never a member.
    ///
    /// # Errors
    ///
    /// Only storage failures; a denial is an `Ok` outcome.
    pub fn check_private_location_access(
        &self,
        actor: &Identity,
        room_id: RoomId,
    ) -> Result<AccessCheck> {
        let (check, _) = self.decide_and_record(actor, room_id)?;
        Ok(check)
    }

    /// Returns the room with its exact location and address if `actor` is
    /// authorized.
    ///
    /// # Errors
    ///
    /// Missing and deleted rooms both yield the same `NotFound`; every other
    /// denial yields a generic `Forbidden`.
    pub fn reveal_private_room(&self, actor: &Identity, room_id: RoomId) -> Result<PrivateRoom> {
        let (check, record) = self.decide_and_record(actor, room_id)?;

        match (check.reason, record) {
            (_, Some(record)) if check.authorized => Ok(record.into_private()),
            (AccessReason::RoomNotFound | AccessReason::RoomInactive, _) => {
                Err(RoomgateError::NotFound("Room not found".to_string()))
            }
            _ => Err(RoomgateError::Forbidden(
                "You do not have access to this room's details".to_string(),
            )),
        }
    }

    /// All decisions recorded for a room, oldest first. For compliance
    /// review; not exposed to room participants.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn decisions_for_room(&self, room_id: RoomId) -> Result<Vec<AccessDecision>> {
        self.store
            .read(|conn| audit::decisions_for_room(conn, room_id))
    }

    fn decide_and_record(
        &self,
        actor: &Identity,
        room_id: RoomId,
    ) -> Result<(AccessCheck, Option<RoomRecord>)> {
        let now = self.clock.now();

        let (check, record) = self.store.write(|conn| {
            let record = rooms::get_room(conn, room_id)?;
            let reason = decide(conn, actor, record.as_ref())?;
            audit::record_decision(conn, actor.user_id, room_id, reason, now)?;
            let check = AccessCheck::from(reason);
            Ok((check, record.filter(|_| check.authorized)))
        })?;

        let reason = check.reason.code();
        if check.authorized {
            tracing::info!(
                target: AUDIT_TARGET,
                user_id = %actor.user_id,
                room_id = %room_id,
                granted = true,
                reason = %reason,
                "Private location access granted"
            );
        } else {
            tracing::warn!(
                target: AUDIT_TARGET,
                user_id = %actor.user_id,
                room_id = %room_id,
                granted = false,
                reason = %reason,
                "Private location access denied"
            );
        }

        Ok((check, record))
    }
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard").finish_non_exhaustive()
    }
}

fn decide(conn: &Connection, actor: &Identity, record: Option<&RoomRecord>) -> Result<AccessReason> {
    let Some(record) = record else {
        return Ok(AccessReason::RoomNotFound);
    };
    if !record.room.is_active {
        return Ok(AccessReason::RoomInactive);
    }
    if !actor.is_active {
        return Ok(AccessReason::NotAMember);
    }
    if record.room.host_id == actor.user_id {
        return Ok(AccessReason::UserIsHost);
    }

    let reason = match memberships::find_membership(conn, record.room.id, actor.user_id)? {
        Some(m) if m.status == MembershipStatus::Active => AccessReason::UserIsActiveMember,
        Some(m) => AccessReason::MembershipStatus(m.status),
        None => AccessReason::NotAMember,
    };
    Ok(reason)
}
