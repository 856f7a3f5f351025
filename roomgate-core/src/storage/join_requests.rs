//! Join request repository.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{from_millis, invalid_enum, to_millis};
use crate::error::Result;
use crate::ids::{JoinRequestId, RoomId, UserId};
use crate::join_request::{JoinRequest, JoinRequestStatus};

const JOIN_REQUEST_COLUMNS: &str = "id, room_id, user_id, status, message, created_at, updated_at";

fn map_join_request(row: &Row<'_>) -> rusqlite::Result<JoinRequest> {
    let status_str: String = row.get(3)?;
    let status =
        JoinRequestStatus::parse(&status_str).ok_or_else(|| invalid_enum(3, &status_str))?;

    Ok(JoinRequest {
        id: row.get(0)?,
        room_id: row.get(1)?,
        user_id: row.get(2)?,
        status,
        message: row.get(4)?,
        created_at: from_millis(5, row.get(5)?)?,
        updated_at: from_millis(6, row.get(6)?)?,
    })
}

/// Inserts a pending request and returns it.
///
/// # Errors
///
/// Returns an error if the user already has a pending request for the room
/// or the database operation fails.
pub fn insert_join_request(
    conn: &Connection,
    room_id: RoomId,
    user_id: UserId,
    message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<JoinRequest> {
    conn.execute(
        r"
        INSERT INTO join_requests (room_id, user_id, status, message, created_at, updated_at)
        VALUES (?1, ?2, 'pending', ?3, ?4, ?4)
        ",
        params![room_id, user_id, message, to_millis(now)],
    )?;

    Ok(JoinRequest {
        id: JoinRequestId::new(conn.last_insert_rowid()),
        room_id,
        user_id,
        status: JoinRequestStatus::Pending,
        message: message.map(str::to_string),
        created_at: now,
        updated_at: now,
    })
}

/// Writes status, message and update time back to the row.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn save_join_request(conn: &Connection, request: &JoinRequest) -> Result<()> {
    conn.execute(
        "UPDATE join_requests SET status = ?2, message = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            request.id,
            request.status.as_str(),
            request.message,
            to_millis(request.updated_at),
        ],
    )?;
    Ok(())
}

/// Fetches a request by id.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn get_join_request(conn: &Connection, id: JoinRequestId) -> Result<Option<JoinRequest>> {
    let sql = format!("SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], map_join_request).optional()?)
}

/// The user's pending request for the room, if any.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn find_pending(
    conn: &Connection,
    room_id: RoomId,
    user_id: UserId,
) -> Result<Option<JoinRequest>> {
    let sql = format!(
        "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests
         WHERE room_id = ?1 AND user_id = ?2 AND status = 'pending'"
    );
    Ok(conn
        .query_row(&sql, params![room_id, user_id], map_join_request)
        .optional()?)
}

/// Requests for a room, optionally only one user's, newest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn list_for_room(
    conn: &Connection,
    room_id: RoomId,
    only_user: Option<UserId>,
) -> Result<Vec<JoinRequest>> {
    let sql = format!(
        "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests
         WHERE room_id = ?1 AND (?2 IS NULL OR user_id = ?2)
         ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![room_id, only_user], map_join_request)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Every request the user submitted, newest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn list_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<JoinRequest>> {
    let sql = format!(
        "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests
         WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], map_join_request)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
