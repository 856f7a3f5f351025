//! `SQLite` persistence for rooms, memberships, join requests and the
//! access audit log.
//!
//! Repository functions in the submodules take a `&Connection` (usually a
//! transaction) and return fully materialized values. [`Store`] owns the
//! connection pool and the per-room locks and hands out transactions:
//!
//! - [`Store::read`] runs a deferred transaction so multi-statement reads see
//!   one snapshot.
//! - [`Store::write`] runs an `IMMEDIATE` transaction.
//! - [`Store::write_room`] takes the room's lock first, then an `IMMEDIATE`
//!   transaction. Every membership or capacity mutation goes through it.
//!
//! The schema backs up the domain rules: one membership row per user and
//! room, dense waitlist positions are unique per room, and status columns
//! only hold known values.

pub mod audit;
pub mod join_requests;
pub mod locks;
pub mod memberships;
pub mod rooms;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, TransactionBehavior};

pub use locks::RoomLocks;

use crate::config::StoreConfig;
use crate::error::{Result, RoomgateError};
use crate::ids::RoomId;

const SCHEMA: &str = r"
    -- Rooms. Exact and public location are set together or not at all.
    CREATE TABLE IF NOT EXISTS rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        host_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        address TEXT,
        status TEXT NOT NULL DEFAULT 'scheduled'
            CHECK (status IN ('scheduled', 'active', 'finished', 'cancelled')),
        capacity INTEGER CHECK (capacity IS NULL OR capacity > 0),
        scheduled_at INTEGER,
        exact_lat REAL,
        exact_lon REAL,
        public_lat REAL,
        public_lon REAL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        finished_at INTEGER,
        CHECK ((exact_lat IS NULL) = (exact_lon IS NULL)),
        CHECK ((public_lat IS NULL) = (public_lon IS NULL)),
        CHECK ((exact_lat IS NULL) = (public_lat IS NULL))
    );

    CREATE INDEX IF NOT EXISTS idx_rooms_exact_location ON rooms(exact_lat, exact_lon);

    -- One row per (user, room), reused across stays.
    CREATE TABLE IF NOT EXISTS memberships (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id INTEGER NOT NULL REFERENCES rooms(id),
        user_id INTEGER NOT NULL,
        is_host INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL
            CHECK (status IN ('active', 'waitlisted', 'left', 'removed', 'kicked')),
        queue_position INTEGER CHECK (queue_position IS NULL OR queue_position > 0),
        joined_at INTEGER NOT NULL,
        left_at INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (user_id, room_id),
        CHECK ((status = 'waitlisted') = (queue_position IS NOT NULL))
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_memberships_waitlist_slot
        ON memberships(room_id, queue_position) WHERE status = 'waitlisted';

    CREATE TABLE IF NOT EXISTS join_requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id INTEGER NOT NULL REFERENCES rooms(id),
        user_id INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'approved', 'rejected', 'cancelled')),
        message TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_join_requests_one_pending
        ON join_requests(room_id, user_id) WHERE status = 'pending';

    -- Append-only. No foreign key: lookups of missing rooms are recorded too.
    CREATE TABLE IF NOT EXISTS access_decisions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        granted INTEGER NOT NULL CHECK (granted IN (0, 1)),
        reason TEXT NOT NULL,
        decided_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_access_decisions_room ON access_decisions(room_id);
";

/// Pooled `SQLite` store with per-room write serialization.
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
    locks: RoomLocks,
}

impl Store {
    /// Opens (creating if needed) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built or the schema cannot be
    /// created.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let timeout = config.lock_timeout;
        let manager = SqliteConnectionManager::file(&config.database_path)
            .with_init(move |conn| configure_connection(conn, timeout));

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(timeout)
            .build(manager)?;

        Self::with_pool(pool, timeout)
    }

    /// Opens a database file with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(&StoreConfig {
            database_path: path.to_path_buf(),
            ..StoreConfig::default()
        })
    }

    /// Creates an in-memory store.
    ///
    /// The pool holds exactly one connection, since every in-memory
    /// connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory() -> Result<Self> {
        let timeout = StoreConfig::default().lock_timeout;
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.pragma_update(None, "foreign_keys", "ON"));

        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .connection_timeout(timeout)
            .build(manager)?;

        Self::with_pool(pool, timeout)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>, lock_timeout: Duration) -> Result<Self> {
        let store = Self {
            pool,
            locks: RoomLocks::new(lock_timeout),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| RoomgateError::Busy(format!("No database connection available: {e}")))
    }

    /// Runs `f` in a deferred transaction.
    ///
    /// # Errors
    ///
    /// Propagates errors from `f` and from the database.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` in an `IMMEDIATE` transaction. Rolls back if `f` fails.
    ///
    /// # Errors
    ///
    /// Propagates errors from `f` and from the database.
    pub fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` under `room_id`'s lock in an `IMMEDIATE` transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RoomgateError::Busy`] if the room lock is not acquired
    /// within the configured timeout; otherwise propagates errors from `f`.
    pub fn write_room<T>(&self, room_id: RoomId, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.locks.with_room(room_id, || self.write(f))
    }

    /// The per-room lock table.
    #[must_use]
    pub const fn locks(&self) -> &RoomLocks {
        &self.locks
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("pool_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")
}

/// Converts a timestamp to the stored representation (Unix milliseconds).
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Reads a stored timestamp.
pub(crate) fn from_millis(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

/// Reads an optional stored timestamp.
pub(crate) fn from_millis_opt(idx: usize, millis: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    millis.map(|m| from_millis(idx, m)).transpose()
}

/// Error for a status column holding an unknown value.
pub(crate) fn invalid_enum(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unknown status: {value}").into(),
    )
}
