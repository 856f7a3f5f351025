//! Location privacy: public-location derivation and distance fuzzing.
//!
//! This module provides functions for:
//! - Deriving a randomized public location 200-500 m away from the exact one
//! - Fuzzing reported distances with i.i.d. noise to defeat triangulation
//! - Clamping short distances so proximity cannot be measured precisely
//!
//! # Threat Model
//!
//! | Attack | Defence |
//! |--------|---------|
//! | Read the public point | Offset is random in bearing and radius |
//! | Average many public points | Resampled only when the host edits coordinates |
//! | Query distance from several origins | Each reported distance carries fresh 5-15% noise |
//! | Walk towards the room until distance is ~0 | Distances below 100 m are reported as 100 m |
//!
//! All randomness comes from an injected [`RandomSource`], so tests can seed
//! it while production draws from the operating system's CSPRNG.

use std::f64::consts::TAU;
use std::fmt;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use super::types::Coordinates;

/// Minimum offset between the exact and public location.
pub const MIN_OFFSET_METERS: f64 = 200.0;

/// Maximum offset between the exact and public location.
pub const MAX_OFFSET_METERS: f64 = 500.0;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Lower bound of the relative noise applied to reported distances.
pub const DISTANCE_FUZZ_MIN_PERCENT: f64 = 0.05;

/// Upper bound of the relative noise applied to reported distances.
pub const DISTANCE_FUZZ_MAX_PERCENT: f64 = 0.15;

/// Smallest distance ever reported to a caller.
pub const MIN_DISPLAY_DISTANCE_METERS: f64 = 100.0;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Decimal places kept on a derived public point (~0.1 m).
const PUBLIC_LOCATION_DECIMALS: i32 = 6;

/// Decimal places kept on a reported distance.
const DISTANCE_DECIMALS: i32 = 2;

/// Bound on resampling when a candidate falls outside the offset band after
/// clamping and rounding.
const MAX_DERIVATION_ATTEMPTS: usize = 16;

/// Source of randomness for location privacy operations.
///
/// Production code uses [`RandomSource::os`], which draws from the
/// thread-local CSPRNG on every call. Tests use [`RandomSource::seeded`] for
/// reproducible sequences.
pub struct RandomSource {
    inner: Source,
}

enum Source {
    Os,
    Seeded(Mutex<StdRng>),
}

impl RandomSource {
    /// Secure default source.
    #[must_use]
    pub const fn os() -> Self {
        Self { inner: Source::Os }
    }

    /// Deterministic source for reproducible tests.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Source::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
        match &self.inner {
            Source::Os => f(&mut rand::thread_rng()),
            Source::Seeded(rng) => f(&mut *rng.lock()),
        }
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::os()
    }
}

impl fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.inner {
            Source::Os => "os",
            Source::Seeded(_) => "seeded",
        };
        f.debug_struct("RandomSource").field("kind", &kind).finish()
    }
}

/// Location privacy engine.
///
/// Stateless apart from its randomness source; safe to share between threads.
///
/// # Example
///
/// ```
/// use roomgate_core::location::{haversine_distance, Coordinates, GeoPrivacy};
///
/// let privacy = GeoPrivacy::seeded(7);
/// let exact = Coordinates::new(40.758, -73.9855).unwrap();
/// let public = privacy.derive_public_location(exact);
///
/// let offset = haversine_distance(exact, public);
/// assert!((200.0..=500.0).contains(&offset));
/// ```
#[derive(Debug, Default)]
pub struct GeoPrivacy {
    random: RandomSource,
}

impl GeoPrivacy {
    /// Creates an engine backed by the secure default source.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            random: RandomSource::os(),
        }
    }

    /// Creates an engine with an explicit randomness source.
    #[must_use]
    pub const fn with_source(random: RandomSource) -> Self {
        Self { random }
    }

    /// Creates an engine with a seeded source.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_source(RandomSource::seeded(seed))
    }

    /// Derives a fresh public location for `exact`. See [`derive_public_location`].
    #[must_use]
    pub fn derive_public_location(&self, exact: Coordinates) -> Coordinates {
        self.random
            .with_rng(|rng| derive_public_location(rng, exact))
    }

    /// Applies fresh distance noise. See [`fuzz_distance`].
    #[must_use]
    pub fn fuzz_distance(&self, meters: f64) -> f64 {
        self.random.with_rng(|rng| fuzz_distance(rng, meters))
    }

    /// The distance shown to a caller: fuzzed, then floored at
    /// [`MIN_DISPLAY_DISTANCE_METERS`].
    #[must_use]
    pub fn reported_distance(&self, meters: f64) -> f64 {
        clamp_minimum_distance(self.fuzz_distance(meters))
    }
}

/// Derives a public location 200-500 m from `exact`.
///
/// Picks a uniform bearing in `[0, 2π)` and a uniform radial offset in
/// `[200, 500)` meters, converts the north/east components to degrees
/// (longitude scaled by `cos(latitude)`), clamps latitude, wraps longitude
/// and rounds to 6 decimals. A candidate whose great-circle distance to
/// `exact` ended up outside `[200, 500]` meters, or that rounds back onto
/// `exact`, is resampled.
///
/// Every call draws new randomness; the result is not invertible and not
/// stable across calls.
pub fn derive_public_location<R: Rng + ?Sized>(rng: &mut R, exact: Coordinates) -> Coordinates {
    let mut candidate = offset_point(rng, exact);

    for _ in 1..MAX_DERIVATION_ATTEMPTS {
        let offset = haversine_distance(exact, candidate);
        if candidate != exact && (MIN_OFFSET_METERS..=MAX_OFFSET_METERS).contains(&offset) {
            break;
        }
        candidate = offset_point(rng, exact);
    }

    candidate
}

fn offset_point<R: Rng + ?Sized>(rng: &mut R, exact: Coordinates) -> Coordinates {
    let distance = rng.gen_range(MIN_OFFSET_METERS..MAX_OFFSET_METERS);
    let bearing = rng.gen_range(0.0..TAU);

    let north = distance * bearing.sin();
    let east = distance * bearing.cos();

    let lat_delta = north / METERS_PER_DEGREE;
    // Degenerates toward the poles; rooms are not expected there.
    let meters_per_degree_lon = METERS_PER_DEGREE * exact.latitude().to_radians().cos();
    let lon_delta = if meters_per_degree_lon.abs() < f64::EPSILON {
        0.0
    } else {
        east / meters_per_degree_lon
    };

    let latitude = round_to((exact.latitude() + lat_delta).clamp(-90.0, 90.0), PUBLIC_LOCATION_DECIMALS);
    let longitude = round_to(
        wrap_longitude(exact.longitude() + lon_delta),
        PUBLIC_LOCATION_DECIMALS,
    );

    Coordinates::from_trusted(latitude, longitude)
}

/// Adds independent noise of 5-15% with a random sign to a true distance.
///
/// Non-positive distances are returned as `0.0`-floored without noise, and
/// non-finite input yields `0.0`. The result is rounded to 2 decimals and
/// never negative. Each call draws fresh randomness, so repeated queries see
/// i.i.d. noise.
pub fn fuzz_distance<R: Rng + ?Sized>(rng: &mut R, meters: f64) -> f64 {
    if !meters.is_finite() {
        return 0.0;
    }
    if meters <= 0.0 {
        return 0.0;
    }

    let noise = rng.gen_range(DISTANCE_FUZZ_MIN_PERCENT..DISTANCE_FUZZ_MAX_PERCENT);
    let signed = if rng.gen_bool(0.5) { -noise } else { noise };

    round_to(meters * (1.0 + signed), DISTANCE_DECIMALS).max(0.0)
}

/// Floors any distance below 100 m up to exactly 100 m.
#[must_use]
pub fn clamp_minimum_distance(meters: f64) -> f64 {
    // f64::max returns the non-NaN operand, so NaN also becomes 100.
    meters.max(MIN_DISPLAY_DISTANCE_METERS)
}

/// Great-circle distance between two points in meters (haversine).
#[must_use]
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude() - a.longitude()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Rounds `value` to `decimals` decimal places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let multiplier = 10_f64.powi(decimals);
    (value * multiplier).round() / multiplier
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..=180.0).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}
