//! The authenticated requester.
//!
//! An [`Identity`] is produced once per request from a validated session
//! token and then passed explicitly into every access-controlled operation.

use serde::{Deserialize, Serialize};

use crate::types::{Email, Role, UserId};

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account ID.
    pub id: UserId,
    /// Account email.
    pub email: Email,
    /// Account role at the time the token was issued.
    pub role: Role,
    /// Display name.
    pub name: String,
}

impl Identity {
    /// Whether this requester is a system administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
