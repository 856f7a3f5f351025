//! Membership repository.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{from_millis, from_millis_opt, invalid_enum, to_millis};
use crate::error::Result;
use crate::ids::{MembershipId, RoomId, UserId};
use crate::membership::{Membership, MembershipStatus};

const MEMBERSHIP_COLUMNS: &str = "id, room_id, user_id, is_host, status, queue_position, \
     joined_at, left_at, created_at, updated_at";

fn map_membership(row: &Row<'_>) -> rusqlite::Result<Membership> {
    let status_str: String = row.get(4)?;
    let status =
        MembershipStatus::parse(&status_str).ok_or_else(|| invalid_enum(4, &status_str))?;

    Ok(Membership {
        id: row.get(0)?,
        room_id: row.get(1)?,
        user_id: row.get(2)?,
        is_host: row.get(3)?,
        status,
        queue_position: row.get(5)?,
        joined_at: from_millis(6, row.get(6)?)?,
        left_at: from_millis_opt(7, row.get(7)?)?,
        created_at: from_millis(8, row.get(8)?)?,
        updated_at: from_millis(9, row.get(9)?)?,
    })
}

/// Inserts a membership row and returns it.
///
/// # Errors
///
/// Returns an error if the row violates a constraint (for example a second
/// row for the same user and room) or the database operation fails.
pub fn insert_membership(
    conn: &Connection,
    room_id: RoomId,
    user_id: UserId,
    is_host: bool,
    status: MembershipStatus,
    queue_position: Option<u32>,
    now: DateTime<Utc>,
) -> Result<Membership> {
    let now_ms = to_millis(now);
    conn.execute(
        r"
        INSERT INTO memberships (room_id, user_id, is_host, status, queue_position,
                                 joined_at, left_at, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?6, ?6)
        ",
        params![room_id, user_id, is_host, status.as_str(), queue_position, now_ms],
    )?;

    Ok(Membership {
        id: MembershipId::new(conn.last_insert_rowid()),
        room_id,
        user_id,
        is_host,
        status,
        queue_position,
        joined_at: now,
        left_at: None,
        created_at: now,
        updated_at: now,
    })
}

/// Writes the mutable columns of `membership` back to its row.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn save_membership(conn: &Connection, membership: &Membership) -> Result<()> {
    conn.execute(
        r"
        UPDATE memberships SET
            status = ?2, queue_position = ?3, joined_at = ?4, left_at = ?5, updated_at = ?6
        WHERE id = ?1
        ",
        params![
            membership.id,
            membership.status.as_str(),
            membership.queue_position,
            to_millis(membership.joined_at),
            membership.left_at.map(to_millis),
            to_millis(membership.updated_at),
        ],
    )?;
    Ok(())
}

/// Fetches a membership row by id.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn get_membership(conn: &Connection, id: MembershipId) -> Result<Option<Membership>> {
    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], map_membership).optional()?)
}

/// Fetches the row for `user_id` in `room_id`, if any.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn find_membership(
    conn: &Connection,
    room_id: RoomId,
    user_id: UserId,
) -> Result<Option<Membership>> {
    let sql =
        format!("SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE room_id = ?1 AND user_id = ?2");
    Ok(conn
        .query_row(&sql, params![room_id, user_id], map_membership)
        .optional()?)
}

/// Number of non-host `Active` rows in the room.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn count_active_guests(conn: &Connection, room_id: RoomId) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM memberships WHERE room_id = ?1 AND status = 'active' AND is_host = 0",
        params![room_id],
        |row| row.get(0),
    )?)
}

/// Highest waitlist position in the room, or 0 when the waitlist is empty.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn max_queue_position(conn: &Connection, room_id: RoomId) -> Result<u32> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(queue_position), 0) FROM memberships
         WHERE room_id = ?1 AND status = 'waitlisted'",
        params![room_id],
        |row| row.get(0),
    )?)
}

/// Rows in the room with `status`; waitlisted rows come in queue order,
/// others by join time.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn list_by_status(
    conn: &Connection,
    room_id: RoomId,
    status: MembershipStatus,
) -> Result<Vec<Membership>> {
    let sql = format!(
        "SELECT {MEMBERSHIP_COLUMNS} FROM memberships
         WHERE room_id = ?1 AND status = ?2
         ORDER BY queue_position, is_host DESC, joined_at, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![room_id, status.as_str()], map_membership)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Moves every waitlisted row behind `removed_position` up by one.
///
/// Rows are shifted in ascending order so the unique `(room, position)`
/// index never sees two rows on one slot. The caller must already have
/// taken the row at `removed_position` off the waitlist.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn close_gap(
    conn: &Connection,
    room_id: RoomId,
    removed_position: u32,
    now: DateTime<Utc>,
) -> Result<usize> {
    let mut select = conn.prepare(
        "SELECT id, queue_position FROM memberships
         WHERE room_id = ?1 AND status = 'waitlisted' AND queue_position > ?2
         ORDER BY queue_position",
    )?;
    let behind = select
        .query_map(params![room_id, removed_position], |row| {
            Ok((row.get::<_, MembershipId>(0)?, row.get::<_, u32>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut update = conn.prepare(
        "UPDATE memberships SET queue_position = ?2, updated_at = ?3 WHERE id = ?1",
    )?;
    let now_ms = to_millis(now);
    for (id, position) in &behind {
        update.execute(params![id, position - 1, now_ms])?;
    }

    Ok(behind.len())
}
