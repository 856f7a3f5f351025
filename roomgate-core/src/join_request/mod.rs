//! Join requests: how a prospective member asks the host for a seat.

pub mod process;
pub mod types;

pub use process::JoinRequestProcess;
pub use types::{
    JoinRequest, JoinRequestOutcome, JoinRequestStatus, JoinRequestUpdate, MAX_MESSAGE_CHARS,
};
