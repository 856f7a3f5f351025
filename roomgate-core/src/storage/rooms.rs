//! Room repository.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};

use super::{from_millis, from_millis_opt, invalid_enum, to_millis};
use crate::error::Result;
use crate::ids::{RoomId, UserId};
use crate::location::Coordinates;
use crate::room::{NewRoom, PrivateRoom, Room, RoomStatus};

const ROOM_COLUMNS: &str = "id, host_id, name, description, address, status, capacity, \
     scheduled_at, exact_lat, exact_lon, public_lat, public_lon, is_active, \
     created_at, updated_at, finished_at";

/// A room row with every column, including private ones.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRecord {
    /// Public view.
    pub room: Room,
    /// Exact venue coordinates.
    pub exact_location: Option<Coordinates>,
    /// Venue street address.
    pub address: Option<String>,
}

impl RoomRecord {
    /// Converts into the view returned to an authorized caller.
    #[must_use]
    pub fn into_private(self) -> PrivateRoom {
        PrivateRoom {
            room: self.room,
            exact_location: self.exact_location,
            address: self.address,
        }
    }
}

/// Bounding box used to prefilter proximity searches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

fn map_room(row: &Row<'_>) -> rusqlite::Result<RoomRecord> {
    let status_str: String = row.get(5)?;
    let status = RoomStatus::parse(&status_str).ok_or_else(|| invalid_enum(5, &status_str))?;

    let exact_lat: Option<f64> = row.get(8)?;
    let exact_lon: Option<f64> = row.get(9)?;
    let public_lat: Option<f64> = row.get(10)?;
    let public_lon: Option<f64> = row.get(11)?;

    let room = Room {
        id: row.get(0)?,
        host_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        status,
        capacity: row.get(6)?,
        scheduled_at: from_millis_opt(7, row.get(7)?)?,
        public_location: public_lat
            .zip(public_lon)
            .map(|(lat, lon)| Coordinates::from_trusted(lat, lon)),
        is_active: row.get(12)?,
        created_at: from_millis(13, row.get(13)?)?,
        updated_at: from_millis(14, row.get(14)?)?,
        finished_at: from_millis_opt(15, row.get(15)?)?,
    };

    Ok(RoomRecord {
        room,
        exact_location: exact_lat
            .zip(exact_lon)
            .map(|(lat, lon)| Coordinates::from_trusted(lat, lon)),
        address: row.get(4)?,
    })
}

/// Inserts a new room and returns its id.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn insert_room(
    conn: &Connection,
    host_id: UserId,
    new: &NewRoom,
    public_location: Option<Coordinates>,
    now: DateTime<Utc>,
) -> Result<RoomId> {
    let now_ms = to_millis(now);
    conn.execute(
        r"
        INSERT INTO rooms (host_id, name, description, address, status, capacity, scheduled_at,
                           exact_lat, exact_lon, public_lat, public_lon, is_active,
                           created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?12)
        ",
        params![
            host_id,
            new.name.trim(),
            new.description,
            new.address,
            RoomStatus::Scheduled.as_str(),
            new.capacity,
            new.scheduled_at.map(to_millis),
            new.location.map(|c| c.latitude()),
            new.location.map(|c| c.longitude()),
            public_location.map(|c| c.latitude()),
            public_location.map(|c| c.longitude()),
            now_ms,
        ],
    )?;
    Ok(RoomId::new(conn.last_insert_rowid()))
}

/// Fetches a room by id, including soft-deleted rooms.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn get_room(conn: &Connection, id: RoomId) -> Result<Option<RoomRecord>> {
    let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], map_room).optional()?)
}

/// Writes every mutable column of `record` back to its row.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn save_room(conn: &Connection, record: &RoomRecord) -> Result<()> {
    let room = &record.room;
    conn.execute(
        r"
        UPDATE rooms SET
            name = ?2, description = ?3, address = ?4, status = ?5, capacity = ?6,
            scheduled_at = ?7, exact_lat = ?8, exact_lon = ?9, public_lat = ?10,
            public_lon = ?11, is_active = ?12, updated_at = ?13, finished_at = ?14
        WHERE id = ?1
        ",
        params![
            room.id,
            room.name,
            room.description,
            record.address,
            room.status.as_str(),
            room.capacity,
            room.scheduled_at.map(to_millis),
            record.exact_location.map(|c| c.latitude()),
            record.exact_location.map(|c| c.longitude()),
            room.public_location.map(|c| c.latitude()),
            room.public_location.map(|c| c.longitude()),
            room.is_active,
            to_millis(room.updated_at),
            room.finished_at.map(to_millis),
        ],
    )?;
    Ok(())
}

/// Active rooms with an exact location inside `bbox` and one of `statuses`.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn rooms_in_box(
    conn: &Connection,
    bbox: &BoundingBox,
    statuses: &[RoomStatus],
) -> Result<Vec<RoomRecord>> {
    let mut sql = format!(
        "SELECT {ROOM_COLUMNS} FROM rooms
         WHERE is_active = 1 AND exact_lat IS NOT NULL
           AND exact_lat BETWEEN ? AND ?"
    );
    let mut values = vec![Value::Real(bbox.min_lat), Value::Real(bbox.max_lat)];

    // A box crossing the antimeridian is split into two longitude ranges.
    if bbox.min_lon <= bbox.max_lon {
        sql.push_str(" AND exact_lon BETWEEN ? AND ?");
        values.extend([Value::Real(bbox.min_lon), Value::Real(bbox.max_lon)]);
    } else {
        sql.push_str(" AND (exact_lon >= ? OR exact_lon <= ?)");
        values.extend([Value::Real(bbox.min_lon), Value::Real(bbox.max_lon)]);
    }

    push_status_filter(&mut sql, &mut values, statuses);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), map_room)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Active rooms with one of `statuses`, ordered by start time then creation.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn list_rooms(
    conn: &Connection,
    statuses: &[RoomStatus],
    skip: u32,
    limit: u32,
) -> Result<Vec<RoomRecord>> {
    let mut sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE is_active = 1");
    let mut values = Vec::new();
    push_status_filter(&mut sql, &mut values, statuses);
    sql.push_str(" ORDER BY scheduled_at IS NULL, scheduled_at, created_at, id LIMIT ? OFFSET ?");
    values.extend([Value::Integer(i64::from(limit)), Value::Integer(i64::from(skip))]);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), map_room)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn push_status_filter(sql: &mut String, values: &mut Vec<Value>, statuses: &[RoomStatus]) {
    if statuses.is_empty() {
        return;
    }
    let placeholders = vec!["?"; statuses.len()].join(", ");
    sql.push_str(&format!(" AND status IN ({placeholders})"));
    values.extend(statuses.iter().map(|s| Value::Text(s.as_str().to_string())));
}
