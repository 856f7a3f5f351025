//! Caller identity as supplied by the external authentication layer.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomgateError};
use crate::ids::UserId;

/// The authenticated caller of an operation.
///
/// Authentication itself happens outside this crate. An inactive account is
/// treated as a stranger: it is never a member for access purposes and may
/// not mutate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id.
    pub user_id: UserId,
    /// Whether the account is currently enabled.
    pub is_active: bool,
}

impl Identity {
    /// An enabled account.
    #[must_use]
    pub const fn active(user_id: UserId) -> Self {
        Self {
            user_id,
            is_active: true,
        }
    }

    /// A disabled account.
    #[must_use]
    pub const fn inactive(user_id: UserId) -> Self {
        Self {
            user_id,
            is_active: false,
        }
    }

    /// Returns the user id if the account may perform mutations.
    ///
    /// # Errors
    ///
    /// Returns [`RoomgateError::Forbidden`] for inactive accounts.
    pub fn require_active(&self) -> Result<UserId> {
        if self.is_active {
            Ok(self.user_id)
        } else {
            Err(RoomgateError::Forbidden("Account is inactive".to_string()))
        }
    }
}
