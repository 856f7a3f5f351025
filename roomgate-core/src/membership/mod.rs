//! Membership and waitlist management.
//!
//! [`MembershipLedger`] is the only writer of membership rows. Admission
//! places a user in a free seat or at the end of the waitlist; leaving,
//! kicking, promotion and waitlist removal keep queue positions dense.

pub mod ledger;
pub mod types;

pub use ledger::MembershipLedger;
pub use types::{Membership, MembershipStatus, WaitlistStanding, WaitlistView};
