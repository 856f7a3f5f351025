//! Address resolution capability.
//!
//! The geocoding algorithm itself is out of scope: callers inject any
//! [`Geocoder`] at the composition root and the crate only applies input
//! validation and error translation around it.

use std::fmt;
use std::sync::Arc;

use super::types::Coordinates;
use crate::error::{Result, RoomgateError};

/// Inputs shorter than this (after trimming) are never sent to the geocoder.
pub const MIN_ADDRESS_CHARS: usize = 2;

/// An address-to-coordinate oracle.
///
/// Implementations must be stateless from the crate's point of view and
/// signal "not found" by returning `None`, never by panicking.
pub trait Geocoder: Send + Sync {
    /// Resolves free-text `address` to a point, or `None` if unknown.
    fn address_to_coordinates(&self, address: &str) -> Option<Coordinates>;
}

impl<F> Geocoder for F
where
    F: Fn(&str) -> Option<Coordinates> + Send + Sync,
{
    fn address_to_coordinates(&self, address: &str) -> Option<Coordinates> {
        self(address)
    }
}

/// Geocoder that never resolves anything. Used when no oracle is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn address_to_coordinates(&self, _address: &str) -> Option<Coordinates> {
        None
    }
}

/// Shared handle to the injected geocoder.
#[derive(Clone)]
pub struct GeocoderHandle(Arc<dyn Geocoder>);

impl GeocoderHandle {
    /// Wraps a geocoder implementation.
    pub fn new(geocoder: impl Geocoder + 'static) -> Self {
        Self(Arc::new(geocoder))
    }

    /// Resolves `address`, translating every failure into
    /// [`RoomgateError::LocationUnresolved`].
    ///
    /// # Errors
    ///
    /// Returns `LocationUnresolved` for blank or one-character input and
    /// whenever the oracle has no answer.
    pub fn resolve(&self, address: &str) -> Result<Coordinates> {
        let trimmed = address.trim();
        if trimmed.chars().count() < MIN_ADDRESS_CHARS {
            return Err(RoomgateError::LocationUnresolved);
        }

        self.0
            .address_to_coordinates(trimmed)
            .ok_or(RoomgateError::LocationUnresolved)
    }
}

impl Default for GeocoderHandle {
    fn default() -> Self {
        Self::new(NoGeocoder)
    }
}

impl fmt::Debug for GeocoderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocoderHandle").finish_non_exhaustive()
    }
}
