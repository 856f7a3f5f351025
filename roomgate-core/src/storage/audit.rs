//! Append-only access decision log.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{from_millis, to_millis};
use crate::access::{AccessDecision, AccessReason};
use crate::error::Result;
use crate::ids::{RoomId, UserId};

fn map_decision(row: &Row<'_>) -> rusqlite::Result<AccessDecision> {
    Ok(AccessDecision {
        id: row.get(0)?,
        room_id: row.get(1)?,
        user_id: row.get(2)?,
        granted: row.get(3)?,
        reason: row.get(4)?,
        decided_at: from_millis(5, row.get(5)?)?,
    })
}

/// Appends one decision record and returns its id.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn record_decision(
    conn: &Connection,
    user_id: UserId,
    room_id: RoomId,
    reason: AccessReason,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        r"
        INSERT INTO access_decisions (room_id, user_id, granted, reason, decided_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![room_id, user_id, reason.is_granted(), reason.code(), to_millis(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Every decision recorded for a room, oldest first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn decisions_for_room(conn: &Connection, room_id: RoomId) -> Result<Vec<AccessDecision>> {
    let mut stmt = conn.prepare(
        "SELECT id, room_id, user_id, granted, reason, decided_at
         FROM access_decisions WHERE room_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![room_id], map_decision)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
