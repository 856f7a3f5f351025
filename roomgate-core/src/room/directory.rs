//! Room records, status lifecycle and discovery.
//!
//! [`RoomDirectory`] owns every write to a room row. The exact and public
//! location are always written together: the public point is derived from
//! the exact one in the same statement that stores it.

use std::sync::Arc;

use rusqlite::Connection;

use super::types::{
    CapacityInfo, NewRoom, PrivateRoom, Room, RoomListing, RoomSearch, RoomStatus, RoomUpdate,
    SearchOrigin,
};
use crate::clock::Clock;
use crate::config::SearchConfig;
use crate::error::{Result, RoomgateError};
use crate::identity::Identity;
use crate::ids::{RoomId, UserId};
use crate::location::privacy::EARTH_RADIUS_METERS;
use crate::location::{haversine_distance, Coordinates, GeoPrivacy, GeocoderHandle};
use crate::membership::MembershipStatus;
use crate::storage::rooms::{self, BoundingBox, RoomRecord};
use crate::storage::{memberships, Store};

/// Widening applied to the search bounding box so the planar prefilter
/// never drops a room the great-circle filter would keep.
const BOUNDING_BOX_MARGIN: f64 = 1.01;

/// Room lifecycle and discovery.
pub struct RoomDirectory {
    store: Arc<Store>,
    privacy: Arc<GeoPrivacy>,
    geocoder: GeocoderHandle,
    clock: Arc<dyn Clock>,
    search: SearchConfig,
}

impl RoomDirectory {
    /// Creates a directory over `store`.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        privacy: Arc<GeoPrivacy>,
        geocoder: GeocoderHandle,
        clock: Arc<dyn Clock>,
        search: SearchConfig,
    ) -> Self {
        Self {
            store,
            privacy,
            geocoder,
            clock,
            search,
        }
    }

    // ==================== Lifecycle ====================

    /// Opens a room hosted by `actor`.
    ///
    /// When `new.location` is set a public location is derived from it;
    /// otherwise both stay empty. The host's own membership row is created
    /// in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a bad name or capacity, `Forbidden` for an
    /// inactive account.
    pub fn create_room(&self, actor: &Identity, new: &NewRoom) -> Result<PrivateRoom> {
        let host_id = actor.require_active()?;
        new.validate()?;

        let public_location = new
            .location
            .map(|exact| self.privacy.derive_public_location(exact));
        let now = self.clock.now();

        let record = self.store.write(|conn| {
            let room_id = rooms::insert_room(conn, host_id, new, public_location, now)?;
            memberships::insert_membership(
                conn,
                room_id,
                host_id,
                true,
                MembershipStatus::Active,
                None,
                now,
            )?;
            load_room(conn, room_id)
        })?;

        tracing::info!(
            room_id = %record.room.id,
            user_id = %host_id,
            has_location = record.exact_location.is_some(),
            "Room created"
        );
        Ok(record.into_private())
    }

    /// Applies a host's partial edit.
    ///
    /// A location change regenerates the public location in the same write;
    /// re-submitting the stored exact point keeps the current public point.
    /// Clearing the location clears both points. Capacity may be lowered
    /// below the current active count; nobody is displaced.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden` for non-hosts, `InvalidState` for a
    /// finished or cancelled room, `Validation` for bad fields, or `Busy`.
    pub fn update_room(
        &self,
        actor: &Identity,
        room_id: RoomId,
        update: &RoomUpdate,
    ) -> Result<PrivateRoom> {
        let user_id = actor.require_active()?;
        update.validate()?;

        let record = self.store.write_room(room_id, |conn| {
            let mut record = load_live_room(conn, room_id)?;
            require_host(&record.room, user_id)?;
            if record.room.status.is_terminal() {
                return Err(RoomgateError::InvalidState(format!(
                    "Room is {}",
                    record.room.status.as_str()
                )));
            }

            let room = &mut record.room;
            if let Some(name) = &update.name {
                room.name = name.trim().to_string();
            }
            if let Some(description) = &update.description {
                room.description.clone_from(description);
            }
            if let Some(capacity) = update.capacity {
                room.capacity = capacity;
            }
            if let Some(scheduled_at) = update.scheduled_at {
                room.scheduled_at = scheduled_at;
            }
            if let Some(address) = &update.address {
                record.address.clone_from(address);
            }
            if let Some(location) = update.location {
                self.apply_location(&mut record, location);
            }
            record.room.updated_at = self.clock.now();

            rooms::save_room(conn, &record)?;
            Ok(record)
        })?;

        tracing::info!(room_id = %room_id, user_id = %user_id, "Room updated");
        Ok(record.into_private())
    }

    /// Replaces (or clears) the exact location, regenerating the public one.
    ///
    /// # Errors
    ///
    /// Same as [`RoomDirectory::update_room`].
    pub fn update_location(
        &self,
        actor: &Identity,
        room_id: RoomId,
        location: Option<Coordinates>,
    ) -> Result<PrivateRoom> {
        let update = RoomUpdate {
            location: Some(location),
            ..RoomUpdate::default()
        };
        self.update_room(actor, room_id, &update)
    }

    fn apply_location(&self, record: &mut RoomRecord, location: Option<Coordinates>) {
        match location {
            Some(exact) if record.exact_location == Some(exact) => {}
            Some(exact) => {
                record.exact_location = Some(exact);
                record.room.public_location = Some(self.privacy.derive_public_location(exact));
            }
            None => {
                record.exact_location = None;
                record.room.public_location = None;
            }
        }
    }

    /// Moves a room along its status graph.
    ///
    /// `Scheduled → Active` is refused until the scheduled start has been
    /// reached. Entering `Finished` stamps `finished_at`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden` for non-hosts, `InvalidState` for an
    /// edge not in the graph or an early start, or `Busy`.
    pub fn transition_status(
        &self,
        actor: &Identity,
        room_id: RoomId,
        target: RoomStatus,
    ) -> Result<Room> {
        let user_id = actor.require_active()?;

        let result = self.store.write_room(room_id, |conn| {
            let mut record = load_live_room(conn, room_id)?;
            require_host(&record.room, user_id)?;

            let current = record.room.status;
            if current.is_terminal() {
                return Err(RoomgateError::InvalidState(format!(
                    "Room is already {}",
                    current.as_str()
                )));
            }
            if !current.can_transition_to(target) {
                return Err(RoomgateError::InvalidState(format!(
                    "Invalid status transition from {} to {}",
                    current.as_str(),
                    target.as_str()
                )));
            }

            let now = self.clock.now();
            if current == RoomStatus::Scheduled && target == RoomStatus::Active {
                if let Some(start) = record.room.scheduled_at {
                    if now < start {
                        return Err(RoomgateError::InvalidState(
                            "Room cannot start before its scheduled time".to_string(),
                        ));
                    }
                }
            }

            record.room.status = target;
            record.room.updated_at = now;
            if target == RoomStatus::Finished {
                record.room.finished_at = Some(now);
            }
            rooms::save_room(conn, &record)?;
            Ok(record.room)
        });

        match &result {
            Ok(room) => tracing::info!(
                room_id = %room_id,
                user_id = %user_id,
                status = room.status.as_str(),
                "Room status changed"
            ),
            Err(e) => tracing::warn!(
                room_id = %room_id,
                user_id = %user_id,
                target = target.as_str(),
                error = %e,
                "Room status change rejected"
            ),
        }
        result
    }

    /// Soft-deletes a room. It disappears from discovery and public fetch;
    /// rows referencing it are kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden` for non-hosts, or `Busy`.
    pub fn delete_room(&self, actor: &Identity, room_id: RoomId) -> Result<()> {
        let user_id = actor.require_active()?;

        self.store.write_room(room_id, |conn| {
            let mut record = load_live_room(conn, room_id)?;
            require_host(&record.room, user_id)?;
            record.room.is_active = false;
            record.room.updated_at = self.clock.now();
            rooms::save_room(conn, &record)
        })?;

        tracing::info!(room_id = %room_id, user_id = %user_id, "Room deleted");
        Ok(())
    }

    // ==================== Queries ====================

    /// Fetches the public view of a live room.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing or deleted rooms.
    pub fn get_room(&self, room_id: RoomId) -> Result<Room> {
        self.store
            .read(|conn| load_live_room(conn, room_id))
            .map(|record| record.room)
    }

    /// Seat accounting for a live room.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for missing or deleted rooms.
    pub fn capacity_info(&self, room_id: RoomId) -> Result<CapacityInfo> {
        self.store.read(|conn| {
            let record = load_live_room(conn, room_id)?;
            capacity_info(conn, &record.room)
        })
    }

    /// Discovery search.
    ///
    /// With an origin, rooms are filtered by the great-circle distance from
    /// the origin to their *exact* location, but each result reports the
    /// fuzzed, minimum-clamped distance to the *public* location and results
    /// are ordered by that reported distance. Without an origin, rooms are
    /// listed by scheduled start, then creation time.
    ///
    /// # Errors
    ///
    /// Returns `LocationUnresolved` if an address origin cannot be geocoded
    /// and `Validation` for a non-positive radius or zero page size.
    pub fn search(&self, query: &RoomSearch) -> Result<Vec<RoomListing>> {
        let statuses = query
            .statuses
            .clone()
            .unwrap_or_else(RoomStatus::discoverable);
        let limit = query
            .limit
            .unwrap_or(self.search.default_page_size)
            .min(self.search.max_page_size);
        if limit == 0 {
            return Err(RoomgateError::Validation(
                "Limit must be at least 1".to_string(),
            ));
        }

        let origin = match &query.origin {
            None => None,
            Some(SearchOrigin::Point(point)) => Some(*point),
            Some(SearchOrigin::Address(address)) => Some(self.geocoder.resolve(address)?),
        };

        let Some(origin) = origin else {
            let records = self
                .store
                .read(|conn| rooms::list_rooms(conn, &statuses, query.skip, limit))?;
            return Ok(records
                .into_iter()
                .map(|record| RoomListing {
                    room: record.room,
                    distance_meters: None,
                })
                .collect());
        };

        let radius = query
            .radius_meters
            .unwrap_or(self.search.default_radius_meters);
        if !(radius.is_finite() && radius > 0.0) {
            return Err(RoomgateError::Validation(
                "Radius must be positive".to_string(),
            ));
        }
        let radius = radius.min(self.search.max_radius_meters);

        let bbox = bounding_box(origin, radius);
        let candidates = self
            .store
            .read(|conn| rooms::rooms_in_box(conn, &bbox, &statuses))?;

        let mut hits: Vec<RoomListing> = candidates
            .into_iter()
            .filter_map(|record| {
                let exact = record.exact_location?;
                let public = record.room.public_location?;
                if haversine_distance(origin, exact) > radius {
                    return None;
                }
                let reported = self
                    .privacy
                    .reported_distance(haversine_distance(origin, public));
                Some(RoomListing {
                    room: record.room,
                    distance_meters: Some(reported),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            let da = a.distance_meters.unwrap_or_default();
            let db = b.distance_meters.unwrap_or_default();
            da.total_cmp(&db).then_with(|| a.room.id.cmp(&b.room.id))
        });

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(hits.into_iter().skip(skip).take(take).collect())
    }
}

impl std::fmt::Debug for RoomDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomDirectory")
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

// ==================== Shared helpers ====================

/// Loads a room row regardless of its soft-delete flag.
pub(crate) fn load_room(conn: &Connection, room_id: RoomId) -> Result<RoomRecord> {
    rooms::get_room(conn, room_id)?
        .ok_or_else(|| RoomgateError::NotFound("Room not found".to_string()))
}

/// Loads a room that exists and has not been deleted.
pub(crate) fn load_live_room(conn: &Connection, room_id: RoomId) -> Result<RoomRecord> {
    let record = load_room(conn, room_id)?;
    if !record.room.is_active {
        return Err(RoomgateError::NotFound("Room not found".to_string()));
    }
    Ok(record)
}

/// Fails unless `user_id` hosts `room`.
pub(crate) fn require_host(room: &Room, user_id: UserId) -> Result<()> {
    if room.host_id == user_id {
        Ok(())
    } else {
        Err(RoomgateError::Forbidden(
            "Only the host can perform this action".to_string(),
        ))
    }
}

/// Fails if the room no longer accepts occupants.
pub(crate) fn require_open(room: &Room) -> Result<()> {
    if room.status.is_terminal() {
        return Err(RoomgateError::InvalidState(format!(
            "Room is {}",
            room.status.as_str()
        )));
    }
    Ok(())
}

/// Current seat accounting; the single source consulted for admissions and
/// promotions.
pub(crate) fn capacity_info(conn: &Connection, room: &Room) -> Result<CapacityInfo> {
    Ok(CapacityInfo {
        capacity: room.capacity,
        active_count: memberships::count_active_guests(conn, room.id)?,
    })
}

/// Degree box around `origin` that contains every point within `radius`.
fn bounding_box(origin: Coordinates, radius: f64) -> BoundingBox {
    let angular = radius / EARTH_RADIUS_METERS;
    let dlat = angular.to_degrees() * BOUNDING_BOX_MARGIN;
    let min_lat = origin.latitude() - dlat;
    let max_lat = origin.latitude() + dlat;

    // Widest longitude reached by the circle: asin(sin δ / cos φ).
    let ratio = angular.sin() / origin.latitude().to_radians().cos();
    let dlon = if angular < std::f64::consts::FRAC_PI_2 && ratio.is_finite() && ratio < 1.0 {
        ratio.asin().to_degrees() * BOUNDING_BOX_MARGIN
    } else {
        f64::INFINITY
    };

    // Near a pole or for huge radii the box spans every longitude.
    if min_lat <= -90.0 || max_lat >= 90.0 || dlon >= 180.0 {
        return BoundingBox {
            min_lat: min_lat.max(-90.0),
            max_lat: max_lat.min(90.0),
            min_lon: -180.0,
            max_lon: 180.0,
        };
    }

    let mut min_lon = origin.longitude() - dlon;
    let mut max_lon = origin.longitude() + dlon;
    if min_lon < -180.0 {
        min_lon += 360.0;
    }
    if max_lon > 180.0 {
        max_lon -= 360.0;
    }

    BoundingBox {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;
    use crate::clock::ManualClock;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn setup() -> (RoomDirectory, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let directory = RoomDirectory::new(
            Arc::new(Store::in_memory().unwrap()),
            Arc::new(GeoPrivacy::seeded(11)),
            GeocoderHandle::default(),
            clock.clone(),
            SearchConfig::default(),
        );
        (directory, clock)
    }

    fn host() -> Identity {
        Identity::active(UserId::new(1))
    }

    fn point(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn create_room_derives_public_location() {
        let (directory, _) = setup();
        let exact = point(52.52, 13.405);
        let created = directory
            .create_room(&host(), &NewRoom::named("Chess").with_location(exact))
            .unwrap();

        assert_eq!(created.exact_location, Some(exact));
        let public = created.room.public_location.unwrap();
        assert_ne!(public, exact);
        let offset = haversine_distance(exact, public);
        assert!((200.0..=500.0).contains(&offset));
    }

    #[test]
    fn create_room_without_location_leaves_both_empty() {
        let (directory, _) = setup();
        let created = directory
            .create_room(&host(), &NewRoom::named("Online"))
            .unwrap();
        assert!(created.exact_location.is_none());
        assert!(created.room.public_location.is_none());
    }

    #[test]
    fn inactive_account_cannot_create() {
        let (directory, _) = setup();
        let result = directory.create_room(&Identity::inactive(UserId::new(1)), &NewRoom::named("x"));
        assert!(matches!(result, Err(RoomgateError::Forbidden(_))));
    }

    #[test]
    fn update_location_regenerates_pair() {
        let (directory, _) = setup();
        let created = directory
            .create_room(&host(), &NewRoom::named("x").with_location(point(10.0, 10.0)))
            .unwrap();
        let first_public = created.room.public_location.unwrap();

        let moved = directory
            .update_location(&host(), created.room.id, Some(point(11.0, 11.0)))
            .unwrap();
        let second_public = moved.room.public_location.unwrap();
        assert_eq!(moved.exact_location, Some(point(11.0, 11.0)));
        assert_ne!(second_public, first_public);
        assert!(haversine_distance(point(11.0, 11.0), second_public) <= 500.0);
    }

    #[test]
    fn same_location_keeps_public_point() {
        let (directory, _) = setup();
        let exact = point(10.0, 10.0);
        let created = directory
            .create_room(&host(), &NewRoom::named("x").with_location(exact))
            .unwrap();
        let updated = directory
            .update_location(&host(), created.room.id, Some(exact))
            .unwrap();
        assert_eq!(updated.room.public_location, created.room.public_location);
    }

    #[test]
    fn clearing_location_clears_both() {
        let (directory, _) = setup();
        let created = directory
            .create_room(&host(), &NewRoom::named("x").with_location(point(1.0, 1.0)))
            .unwrap();
        let cleared = directory
            .update_location(&host(), created.room.id, None)
            .unwrap();
        assert!(cleared.exact_location.is_none());
        assert!(cleared.room.public_location.is_none());
    }

    #[test]
    fn only_host_may_update() {
        let (directory, _) = setup();
        let created = directory.create_room(&host(), &NewRoom::named("x")).unwrap();
        let result = directory.update_room(
            &Identity::active(UserId::new(2)),
            created.room.id,
            &RoomUpdate {
                name: Some("mine now".to_string()),
                ..RoomUpdate::default()
            },
        );
        assert!(matches!(result, Err(RoomgateError::Forbidden(_))));
    }

    #[test]
    fn schedule_guard_blocks_early_start() {
        let (directory, clock) = setup();
        let created = directory
            .create_room(
                &host(),
                &NewRoom::named("x").scheduled_at(start() + TimeDelta::hours(1)),
            )
            .unwrap();
        let id = created.room.id;

        let early = directory.transition_status(&host(), id, RoomStatus::Active);
        assert!(matches!(early, Err(RoomgateError::InvalidState(_))));

        clock.advance(TimeDelta::hours(1));
        let started = directory
            .transition_status(&host(), id, RoomStatus::Active)
            .unwrap();
        assert_eq!(started.status, RoomStatus::Active);
    }

    #[test]
    fn finishing_stamps_finished_at_and_is_terminal() {
        let (directory, clock) = setup();
        let id = directory
            .create_room(&host(), &NewRoom::named("x"))
            .unwrap()
            .room
            .id;
        directory
            .transition_status(&host(), id, RoomStatus::Active)
            .unwrap();
        clock.advance(TimeDelta::minutes(90));
        let finished = directory
            .transition_status(&host(), id, RoomStatus::Finished)
            .unwrap();
        assert_eq!(finished.finished_at, Some(start() + TimeDelta::minutes(90)));

        let again = directory.transition_status(&host(), id, RoomStatus::Cancelled);
        assert!(matches!(again, Err(RoomgateError::InvalidState(_))));
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        let (directory, _) = setup();
        let id = directory
            .create_room(&host(), &NewRoom::named("x"))
            .unwrap()
            .room
            .id;
        let result = directory.transition_status(&host(), id, RoomStatus::Finished);
        assert!(matches!(result, Err(RoomgateError::InvalidState(_))));
    }

    #[test]
    fn deleted_room_is_not_found() {
        let (directory, _) = setup();
        let id = directory
            .create_room(&host(), &NewRoom::named("x"))
            .unwrap()
            .room
            .id;
        directory.delete_room(&host(), id).unwrap();
        assert!(matches!(
            directory.get_room(id),
            Err(RoomgateError::NotFound(_))
        ));
        assert!(directory.delete_room(&host(), id).is_err());
    }

    #[test]
    fn host_is_not_counted_against_capacity() {
        let (directory, _) = setup();
        let id = directory
            .create_room(&host(), &NewRoom::named("x").with_capacity(1))
            .unwrap()
            .room
            .id;
        let info = directory.capacity_info(id).unwrap();
        assert_eq!(info.active_count, 0);
        assert!(info.has_free_slot());
    }

    #[test]
    fn search_filters_by_true_distance_and_reports_fuzzed() {
        let (directory, _) = setup();
        let origin = point(40.0, -74.0);
        // ~1.1 km north and ~55 km north of the origin.
        let near = directory
            .create_room(&host(), &NewRoom::named("near").with_location(point(40.01, -74.0)))
            .unwrap();
        directory
            .create_room(&host(), &NewRoom::named("far").with_location(point(40.5, -74.0)))
            .unwrap();

        let results = directory
            .search(&RoomSearch::near(origin).within(5_000.0))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].room.id, near.room.id);

        let reported = results[0].distance_meters.unwrap();
        assert!(reported >= 100.0);
        let public_distance = haversine_distance(origin, near.room.public_location.unwrap());
        assert!(reported >= public_distance * 0.85 - 0.01);
        assert!(reported <= public_distance * 1.15 + 0.01);
    }

    #[test]
    fn search_caps_radius() {
        let (directory, _) = setup();
        directory
            .create_room(&host(), &NewRoom::named("far").with_location(point(42.0, -74.0)))
            .unwrap();
        // ~222 km away; a 1000 km request is capped at 100 km.
        let results = directory
            .search(&RoomSearch::near(point(40.0, -74.0)).within(1_000_000.0))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn search_rejects_bad_radius() {
        let (directory, _) = setup();
        let result = directory.search(&RoomSearch::near(point(0.0, 0.0)).within(-1.0));
        assert!(matches!(result, Err(RoomgateError::Validation(_))));
    }

    #[test]
    fn unresolved_address_is_reported() {
        let (directory, _) = setup();
        let result = directory.search(&RoomSearch::near_address("Atlantis"));
        assert!(matches!(result, Err(RoomgateError::LocationUnresolved)));
    }

    #[test]
    fn search_without_origin_pages_and_skips_finished() {
        let (directory, _) = setup();
        for i in 0..3 {
            directory
                .create_room(&host(), &NewRoom::named(format!("room {i}")))
                .unwrap();
        }
        let done = directory.create_room(&host(), &NewRoom::named("done")).unwrap();
        directory
            .transition_status(&host(), done.room.id, RoomStatus::Cancelled)
            .unwrap();

        let all = directory.search(&RoomSearch::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|l| l.distance_meters.is_none()));

        let page = directory.search(&RoomSearch::default().page(2, 5)).unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn bounding_box_wraps_antimeridian() {
        let bbox = bounding_box(point(0.0, 179.99), 10_000.0);
        assert!(bbox.min_lon > bbox.max_lon);
        assert!(bbox.max_lon < -179.0);
    }

    #[test]
    fn bounding_box_near_pole_spans_all_longitudes() {
        let bbox = bounding_box(point(89.95, 0.0), 10_000.0);
        assert_eq!(bbox.min_lon, -180.0);
        assert_eq!(bbox.max_lon, 180.0);
        assert_eq!(bbox.max_lat, 90.0);
    }

    #[test]
    fn bounding_box_covers_widest_longitude_at_high_latitude() {
        let origin = point(88.0, 0.0);
        let radius = 99_000.0;
        let bbox = bounding_box(origin, radius);

        // The circle's easternmost point sits poleward of the origin.
        let delta = radius / EARTH_RADIUS_METERS;
        let phi = origin.latitude().to_radians();
        let lon = (delta.sin() / phi.cos()).asin().to_degrees();
        let lat = (phi.sin() / delta.cos()).asin().to_degrees();
        let east = point(lat, lon);

        assert!(haversine_distance(origin, east) <= 100_000.0);
        assert!(bbox.max_lon >= lon);
        assert!(bbox.min_lon <= -lon);
        assert!(bbox.max_lat >= lat);
    }

    #[test]
    fn search_near_pole_finds_room_at_widest_longitude() {
        let (directory, _) = setup();
        let origin = point(88.0, 0.0);
        let delta = 99_000.0 / EARTH_RADIUS_METERS;
        let phi = origin.latitude().to_radians();
        let lon = (delta.sin() / phi.cos()).asin().to_degrees();
        let lat = (phi.sin() / delta.cos()).asin().to_degrees();
        let created = directory
            .create_room(
                &host(),
                &NewRoom::named("Polar").with_location(point(lat, lon)),
            )
            .unwrap();

        let found = directory
            .search(&RoomSearch::near(origin).within(100_000.0))
            .unwrap();
        assert!(found.iter().any(|listing| listing.room.id == created.room.id));
    }
}
