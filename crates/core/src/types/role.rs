//! Account roles.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0} (expected system_admin, normal_user or store_owner)")]
pub struct RoleError(pub String);

/// The role attached to every account.
///
/// There is no default: an unrecognized role is always an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages users and stores, sees everything.
    SystemAdmin,
    /// Browses stores and rates them.
    NormalUser,
    /// Sees aggregated feedback for the stores they own.
    StoreOwner,
}

impl Role {
    /// All roles, in a stable order.
    pub const ALL: [Self; 3] = [Self::SystemAdmin, Self::NormalUser, Self::StoreOwner];

    /// The wire and database spelling of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemAdmin => "system_admin",
            Self::NormalUser => "normal_user",
            Self::StoreOwner => "store_owner",
        }
    }

    /// Whether this role bypasses ownership checks.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::SystemAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system_admin" => Ok(Self::SystemAdmin),
            "normal_user" => Ok(Self::NormalUser),
            "store_owner" => Ok(Self::StoreOwner),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}
