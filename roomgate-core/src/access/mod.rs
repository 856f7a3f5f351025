//! Exact-location access control.
//!
//! - [`AccessGuard`] decides, and audits, who may see a room's exact
//!   location and address
//! - [`sanitize_error_message`] scrubs location-like text from anything
//!   returned to a caller

pub mod guard;
pub mod sanitize;
pub mod types;

pub use guard::AccessGuard;
pub use sanitize::{sanitize_error_message, SANITIZED_LOCATION_MESSAGE};
pub use types::{AccessCheck, AccessDecision, AccessReason};
