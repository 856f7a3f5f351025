//! Location module for Roomgate.
//!
//! Provides privacy-focused handling of room locations:
//! - Validated coordinates
//! - Public-location derivation (a random point 200-500 m from the venue)
//! - Distance fuzzing and minimum-distance clamping for search results
//! - An injectable geocoder for address searches
//!
//! # Privacy Guarantees
//!
//! - The exact point is never derivable from the public point
//! - Every reported distance carries fresh noise
//! - No distance below 100 m is ever reported
//!
//! # Example Usage
//!
//! ```
//! use roomgate_core::location::{Coordinates, GeoPrivacy};
//!
//! let privacy = GeoPrivacy::new();
//! let venue = Coordinates::new(37.7749295, -122.4194155).unwrap();
//! let public = privacy.derive_public_location(venue);
//! assert_ne!(public, venue);
//!
//! let shown = privacy.reported_distance(42.0);
//! assert!(shown >= 100.0);
//! ```

pub mod geocode;
pub mod privacy;
pub mod types;

pub use geocode::{Geocoder, GeocoderHandle, NoGeocoder};
pub use privacy::{
    clamp_minimum_distance, derive_public_location, fuzz_distance, haversine_distance,
    GeoPrivacy, RandomSource, MIN_DISPLAY_DISTANCE_METERS,
};
pub use types::Coordinates;
