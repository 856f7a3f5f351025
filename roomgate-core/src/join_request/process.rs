//! The admission workflow: `pending → approved | rejected | cancelled`.
//!
//! Approval and the resulting admission happen in one transaction under the
//! room lock: either the request is approved *and* the user holds a seat or
//! waitlist slot, or neither change is visible.

use std::sync::Arc;

use super::types::{
    validate_message, JoinRequest, JoinRequestOutcome, JoinRequestStatus, JoinRequestUpdate,
};
use crate::clock::Clock;
use crate::error::{Result, RoomgateError};
use crate::identity::Identity;
use crate::ids::{JoinRequestId, RoomId};
use crate::membership::ledger::admit_in;
use crate::room::directory::{load_live_room, require_open};
use crate::storage::{join_requests, memberships, Store};

/// Join request lifecycle.
pub struct JoinRequestProcess {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl JoinRequestProcess {
    /// Creates the workflow over `store`.
    #[must_use]
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Submits a request to join `room_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the room is missing or deleted
    /// - `InvalidState` if the room is finished or cancelled
    /// - `Forbidden` for the room's host or an inactive account
    /// - `Conflict` if a request is already pending or the caller is
    ///   already active or waitlisted
    /// - `Validation` for an over-long message
    pub fn submit(
        &self,
        actor: &Identity,
        room_id: RoomId,
        message: Option<&str>,
    ) -> Result<JoinRequest> {
        let user_id = actor.require_active()?;
        validate_message(message)?;
        let now = self.clock.now();

        let result = self.store.write_room(room_id, |conn| {
            let record = load_live_room(conn, room_id)?;
            require_open(&record.room)?;
            if record.room.host_id == user_id {
                return Err(RoomgateError::Forbidden(
                    "Host cannot request to join their own room".to_string(),
                ));
            }
            if join_requests::find_pending(conn, room_id, user_id)?.is_some() {
                return Err(RoomgateError::Conflict(
                    "Join request already pending".to_string(),
                ));
            }
            if memberships::find_membership(conn, room_id, user_id)?
                .is_some_and(|m| m.status.is_current())
            {
                return Err(RoomgateError::Conflict(
                    "Already a member of this room".to_string(),
                ));
            }
            join_requests::insert_join_request(conn, room_id, user_id, message, now)
        });

        match &result {
            Ok(request) => tracing::info!(
                room_id = %room_id,
                user_id = %user_id,
                request_id = %request.id,
                "Join request submitted"
            ),
            Err(e) => tracing::warn!(
                room_id = %room_id,
                user_id = %user_id,
                error = %e,
                "Join request rejected"
            ),
        }
        result
    }

    /// The host decides on, or edits the message of, a pending request.
    ///
    /// Approving admits the requester through the membership ledger in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the request or its room is missing
    /// - `Forbidden` unless the caller hosts the room
    /// - `InvalidState` if the request is no longer pending, or approval
    ///   targets a closed room
    /// - `Validation` for a target status other than approved/rejected, or
    ///   an over-long message
    /// - `Conflict` if the requester is somehow already a current occupant
    pub fn update(
        &self,
        actor: &Identity,
        request_id: JoinRequestId,
        update: &JoinRequestUpdate,
    ) -> Result<JoinRequestOutcome> {
        let host_id = actor.require_active()?;
        if let Some(status) = update.status {
            if !matches!(
                status,
                JoinRequestStatus::Approved | JoinRequestStatus::Rejected
            ) {
                return Err(RoomgateError::Validation(
                    "Status must be approved or rejected".to_string(),
                ));
            }
        }
        if let Some(message) = &update.message {
            validate_message(message.as_deref())?;
        }
        let now = self.clock.now();

        let room_id = self
            .store
            .read(|conn| load_request(conn, request_id))?
            .room_id;

        let outcome = self.store.write_room(room_id, |conn| {
            let mut request = load_request(conn, request_id)?;
            let record = load_live_room(conn, request.room_id)?;
            if record.room.host_id != host_id {
                return Err(RoomgateError::Forbidden(
                    "Only the room host can update join requests".to_string(),
                ));
            }
            if request.status != JoinRequestStatus::Pending {
                return Err(RoomgateError::InvalidState(format!(
                    "Join request is already {}",
                    request.status.as_str()
                )));
            }

            if let Some(message) = &update.message {
                request.message.clone_from(message);
            }
            let membership = match update.status {
                Some(JoinRequestStatus::Approved) => {
                    request.status = JoinRequestStatus::Approved;
                    Some(admit_in(conn, &record, request.user_id, now)?)
                }
                Some(status) => {
                    request.status = status;
                    None
                }
                None => None,
            };
            request.updated_at = now;
            join_requests::save_join_request(conn, &request)?;

            Ok(JoinRequestOutcome {
                request,
                membership,
            })
        })?;

        tracing::info!(
            room_id = %room_id,
            user_id = %host_id,
            request_id = %request_id,
            status = outcome.request.status.as_str(),
            "Join request updated"
        );
        Ok(outcome)
    }

    /// Shorthand for approving a request.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::update`].
    pub fn approve(&self, actor: &Identity, request_id: JoinRequestId) -> Result<JoinRequestOutcome> {
        self.update(actor, request_id, &JoinRequestUpdate::approve())
    }

    /// Shorthand for rejecting a request.
    ///
    /// # Errors
    ///
    /// See [`JoinRequestProcess::update`].
    pub fn reject(&self, actor: &Identity, request_id: JoinRequestId) -> Result<JoinRequest> {
        self.update(actor, request_id, &JoinRequestUpdate::reject())
            .map(|outcome| outcome.request)
    }

    /// The requester withdraws a pending request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden` unless the caller submitted the
    /// request, or `InvalidState` if it is no longer pending.
    pub fn cancel(&self, actor: &Identity, request_id: JoinRequestId) -> Result<JoinRequest> {
        let user_id = actor.require_active()?;
        let now = self.clock.now();

        let request = self.store.write(|conn| {
            let mut request = load_request(conn, request_id)?;
            if request.user_id != user_id {
                return Err(RoomgateError::Forbidden(
                    "Only the requester can cancel a join request".to_string(),
                ));
            }
            if request.status != JoinRequestStatus::Pending {
                return Err(RoomgateError::InvalidState(format!(
                    "Join request is already {}",
                    request.status.as_str()
                )));
            }
            request.status = JoinRequestStatus::Cancelled;
            request.updated_at = now;
            join_requests::save_join_request(conn, &request)?;
            Ok(request)
        })?;

        tracing::info!(
            room_id = %request.room_id,
            user_id = %user_id,
            request_id = %request_id,
            "Join request cancelled"
        );
        Ok(request)
    }

    /// A single request, visible to its requester and the room's host.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    pub fn get(&self, actor: &Identity, request_id: JoinRequestId) -> Result<JoinRequest> {
        self.store.read(|conn| {
            let request = load_request(conn, request_id)?;
            if request.user_id == actor.user_id && actor.is_active {
                return Ok(request);
            }
            let host_id = crate::storage::rooms::get_room(conn, request.room_id)?
                .map(|record| record.room.host_id);
            if actor.is_active && host_id == Some(actor.user_id) {
                Ok(request)
            } else {
                Err(RoomgateError::Forbidden(
                    "Not authorized to view this join request".to_string(),
                ))
            }
        })
    }

    /// Requests for a room: the host sees all of them, anyone else only
    /// their own.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing or deleted room, `Forbidden` for an
    /// inactive account.
    pub fn list_for_room(&self, actor: &Identity, room_id: RoomId) -> Result<Vec<JoinRequest>> {
        let user_id = actor.require_active()?;
        self.store.read(|conn| {
            let record = load_live_room(conn, room_id)?;
            let only_user = (record.room.host_id != user_id).then_some(user_id);
            join_requests::list_for_room(conn, room_id, only_user)
        })
    }

    /// Every request the caller has submitted.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for an inactive account.
    pub fn list_mine(&self, actor: &Identity) -> Result<Vec<JoinRequest>> {
        let user_id = actor.require_active()?;
        self.store
            .read(|conn| join_requests::list_for_user(conn, user_id))
    }
}

impl std::fmt::Debug for JoinRequestProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinRequestProcess").finish_non_exhaustive()
    }
}

fn load_request(conn: &rusqlite::Connection, request_id: JoinRequestId) -> Result<JoinRequest> {
    join_requests::get_join_request(conn, request_id)?
        .ok_or_else(|| RoomgateError::NotFound("Join request not found".to_string()))
}
