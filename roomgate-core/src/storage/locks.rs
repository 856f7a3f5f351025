//! Per-room write serialization.
//!
//! Each room gets its own mutex, created on first use and dropped again once
//! nobody holds or waits for it. Different rooms never contend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Result, RoomgateError};
use crate::ids::RoomId;

/// Table of per-room locks with time-bounded acquisition.
#[derive(Debug)]
pub struct RoomLocks {
    slots: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl RoomLocks {
    /// Creates an empty table whose acquisitions give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Runs `f` while holding `room_id`'s lock.
    ///
    /// # Errors
    ///
    /// Returns [`RoomgateError::Busy`] if the lock is not acquired within the
    /// timeout; otherwise returns whatever `f` returns.
    pub fn with_room<T>(&self, room_id: RoomId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let slot = Arc::clone(self.slots.lock().entry(room_id).or_default());

        let result = match slot.try_lock_for(self.timeout) {
            Some(guard) => {
                let value = f();
                drop(guard);
                value
            }
            None => {
                tracing::warn!(room_id = %room_id, "Timed out waiting for room lock");
                Err(RoomgateError::Busy(format!("Room {room_id} is busy")))
            }
        };

        self.release(room_id, &slot);
        result
    }

    /// Drops the table entry if this caller was its last user.
    fn release(&self, room_id: RoomId, slot: &Arc<Mutex<()>>) {
        let mut slots = self.slots.lock();
        // One reference in the table, one held by the caller.
        if Arc::strong_count(slot) == 2 {
            slots.remove(&room_id);
        }
    }

    /// Number of rooms with a live lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no room currently has a lock entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}
