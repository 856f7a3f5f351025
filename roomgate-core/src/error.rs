//! Error types for room, membership and location operations.
//!
//! Every failure in the crate is a [`RoomgateError`]. At the request
//! boundary an error is translated into a [`ClientError`] carrying a stable
//! [`ErrorCode`] and a message that has passed through the location
//! sanitizer, so nothing coordinate-like ever reaches a caller.

use serde::Serialize;
use thiserror::Error;

use crate::access::sanitize_error_message;

/// Error type for Roomgate operations.
#[derive(Error, Debug)]
pub enum RoomgateError {
    /// Room, member or request does not exist (also masks existence probing).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authenticated but not entitled to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation would reuse a unique slot or duplicate a record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The target is in the wrong status for the requested transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed or out-of-range input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A free-text search location could not be geocoded.
    #[error("Could not resolve location")]
    LocationUnresolved,

    /// The room's serialization boundary or a storage connection could not
    /// be acquired in time. Callers may retry.
    #[error("Temporarily unavailable: {0}")]
    Busy(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    /// Connection pool error.
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Result type alias for Roomgate operations.
pub type Result<T> = std::result::Result<T, RoomgateError>;

impl From<rusqlite::Error> for RoomgateError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                Self::Busy(err.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// Stable, machine-readable error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The resource does not exist or must not be acknowledged.
    NotFound,
    /// The caller is not entitled to the operation.
    Forbidden,
    /// Duplicate or conflicting record.
    Conflict,
    /// Wrong status for the requested transition.
    InvalidState,
    /// Malformed input.
    ValidationError,
    /// Search location could not be resolved.
    LocationUnresolved,
    /// Transient failure, safe to retry.
    Unavailable,
    /// Unexpected internal failure.
    Internal,
}

impl ErrorCode {
    /// Converts to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::InvalidState => "invalid_state",
            Self::ValidationError => "validation_error",
            Self::LocationUnresolved => "location_unresolved",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

/// Error shape handed to clients at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientError {
    /// Stable error code.
    pub code: ErrorCode,
    /// Sanitized, human-readable message.
    pub message: String,
}

impl RoomgateError {
    /// Returns the stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::LocationUnresolved => ErrorCode::LocationUnresolved,
            Self::Busy(_) => ErrorCode::Unavailable,
            Self::Storage(_) | Self::Database(_) | Self::Pool(_) => ErrorCode::Internal,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// Translates this error into the shape returned to clients.
    ///
    /// Storage internals are never surfaced; every other message goes
    /// through [`sanitize_error_message`].
    #[must_use]
    pub fn to_client(&self) -> ClientError {
        let message = match self {
            Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::InvalidState(msg)
            | Self::Validation(msg) => sanitize_error_message(msg),
            // Fixed text with no caller input, so it skips the sanitizer.
            Self::LocationUnresolved => "Could not resolve location".to_string(),
            Self::Busy(_) => "The room is busy, please retry".to_string(),
            Self::Storage(_) | Self::Database(_) | Self::Pool(_) => {
                "An internal error occurred".to_string()
            }
        };

        ClientError {
            code: self.code(),
            message,
        }
    }
}
