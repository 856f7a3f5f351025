//! Location data types.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomgateError};

/// A validated WGS84 point.
///
/// Construction through [`Coordinates::new`] rejects NaN, infinities and
/// out-of-range values, so every `Coordinates` in the system is a real point.
///
/// # Example
///
/// ```
/// use roomgate_core::location::Coordinates;
///
/// let point = Coordinates::new(37.7749, -122.4194).unwrap();
/// assert_eq!(point.latitude(), 37.7749);
/// assert!(Coordinates::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

/// Wire shape of [`Coordinates`]; only reaches the type through validation.
#[derive(Deserialize)]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = RoomgateError;

    fn try_from(raw: RawCoordinates) -> Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinates {
    /// Creates a point, validating both components.
    ///
    /// # Errors
    ///
    /// Returns [`RoomgateError::Validation`] if latitude is not in
    /// `-90.0..=90.0` or longitude is not in `-180.0..=180.0`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        // SECURITY: messages name the field but never echo the value.
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(RoomgateError::Validation(
                "Latitude must be between -90 and 90".to_string(),
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(RoomgateError::Validation(
                "Longitude must be between -180 and 180".to_string(),
            ));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds a point from values already known to be in range (storage reads,
    /// derived points that were clamped).
    pub(crate) const fn from_trusted(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}
