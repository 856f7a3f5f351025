//! Roomgate Core Library
//!
//! Core functionality for Roomgate - invite-gated rooms with private venue
//! locations, join requests and capacity-bounded waitlists.
//! This crate provides the Rust implementation for core Roomgate operations.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod access;
mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod ids;
pub mod join_request;
pub mod location;
pub mod logging;
pub mod membership;
pub mod room;
pub mod storage;

pub use api::{Roomgate, RoomgateBuilder};
pub use error::{ClientError, ErrorCode, Result, RoomgateError};
pub use identity::Identity;
pub use ids::{JoinRequestId, MembershipId, RoomId, UserId};
