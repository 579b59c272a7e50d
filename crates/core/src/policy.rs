//! Access-control policy.
//!
//! Every role decision in the service goes through [`authorize`]. It is a
//! pure, total function of the requester, the action and (for owner-scoped
//! actions) the owner of the resource, so the whole decision table can be
//! tested without a server or database.
//!
//! # Rules
//!
//! Evaluated in order, first match wins:
//!
//! 1. No requester -> [`Denial::Unauthenticated`]
//! 2. Action requires a role the requester lacks -> [`Denial::Forbidden`]
//! 3. Action is owner-scoped, requester is not the owner and not an
//!    administrator -> [`Denial::Forbidden`]
//! 4. Otherwise allow

use crate::identity::Identity;
use crate::types::{Role, UserId};

/// Operations guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create an account with any role.
    CreateUser,
    /// Create a store.
    CreateStore,
    /// List and filter all accounts.
    ListUsers,
    /// Read global counts.
    AdminDashboard,
    /// Read feedback for owned stores.
    StoreOwnerDashboard,
    /// Browse stores with aggregates.
    ListStores,
    /// Read a single store.
    ViewStore,
    /// Create or replace the requester's rating of a store.
    SubmitRating,
    /// Delete a rating.
    RetractRating,
    /// List ratings (further scoped by [`crate::query::rating_scope`]).
    ListRatings,
    /// Read an account.
    ViewUser,
    /// Change an account's password.
    ChangePassword,
}

/// What an action demands of the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in account.
    Authenticated,
    /// A specific role.
    Role(Role),
    /// The owner of the resource, or an administrator.
    SelfOrAdmin,
}

impl Action {
    /// Every action, for exhaustive checks.
    pub const ALL: [Self; 12] = [
        Self::CreateUser,
        Self::CreateStore,
        Self::ListUsers,
        Self::AdminDashboard,
        Self::StoreOwnerDashboard,
        Self::ListStores,
        Self::ViewStore,
        Self::SubmitRating,
        Self::RetractRating,
        Self::ListRatings,
        Self::ViewUser,
        Self::ChangePassword,
    ];

    /// The requirement attached to this action.
    #[must_use]
    pub const fn requirement(self) -> Requirement {
        match self {
            Self::CreateUser | Self::CreateStore | Self::ListUsers | Self::AdminDashboard => {
                Requirement::Role(Role::SystemAdmin)
            }
            Self::StoreOwnerDashboard => Requirement::Role(Role::StoreOwner),
            Self::ListStores | Self::ViewStore | Self::SubmitRating | Self::ListRatings => {
                Requirement::Authenticated
            }
            Self::RetractRating | Self::ViewUser | Self::ChangePassword => {
                Requirement::SelfOrAdmin
            }
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    /// No valid identity was presented.
    #[error("authentication required")]
    Unauthenticated,
    /// The identity is valid but not permitted.
    #[error("forbidden")]
    Forbidden,
}

/// Decide whether `requester` may perform `action`.
///
/// `owner` is the account that owns the target resource and is only
/// consulted for [`Requirement::SelfOrAdmin`] actions; a missing owner never
/// matches a requester.
///
/// # Errors
///
/// Returns the [`Denial`] from the first rule that refuses the request.
pub fn authorize(
    requester: Option<&Identity>,
    action: Action,
    owner: Option<UserId>,
) -> Result<&Identity, Denial> {
    let identity = requester.ok_or(Denial::Unauthenticated)?;

    match action.requirement() {
        Requirement::Authenticated => Ok(identity),
        Requirement::Role(role) if identity.role == role => Ok(identity),
        Requirement::Role(_) => Err(Denial::Forbidden),
        Requirement::SelfOrAdmin => {
            let is_owner = owner.is_some_and(|owner| owner == identity.id);
            if is_owner || identity.is_admin() {
                Ok(identity)
            } else {
                Err(Denial::Forbidden)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Email;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::generate(),
            email: Email::parse("someone@example.com").unwrap(),
            role,
            name: "Someone With A Long Enough Name".to_owned(),
        }
    }

    #[test]
    fn test_anonymous_is_unauthenticated_for_every_action() {
        for action in Action::ALL {
            assert_eq!(
                authorize(None, action, Some(UserId::generate())),
                Err(Denial::Unauthenticated),
                "{action:?}"
            );
        }
    }

    #[test]
    fn test_admin_actions_require_system_admin() {
        let admin_actions = [
            Action::CreateUser,
            Action::CreateStore,
            Action::ListUsers,
            Action::AdminDashboard,
        ];
        for action in admin_actions {
            let admin = identity(Role::SystemAdmin);
            assert!(authorize(Some(&admin), action, None).is_ok());

            for role in [Role::NormalUser, Role::StoreOwner] {
                let other = identity(role);
                // Owning the "resource" never substitutes for the role.
                assert_eq!(
                    authorize(Some(&other), action, Some(other.id)),
                    Err(Denial::Forbidden),
                    "{action:?} as {role}"
                );
            }
        }
    }

    #[test]
    fn test_owner_dashboard_is_store_owner_only() {
        let owner = identity(Role::StoreOwner);
        assert!(authorize(Some(&owner), Action::StoreOwnerDashboard, None).is_ok());

        for role in [Role::SystemAdmin, Role::NormalUser] {
            let other = identity(role);
            assert_eq!(
                authorize(Some(&other), Action::StoreOwnerDashboard, None),
                Err(Denial::Forbidden)
            );
        }
    }

    #[test]
    fn test_authenticated_actions_allow_every_role() {
        let actions = [
            Action::ListStores,
            Action::ViewStore,
            Action::SubmitRating,
            Action::ListRatings,
        ];
        for action in actions {
            for role in Role::ALL {
                let who = identity(role);
                assert!(authorize(Some(&who), action, None).is_ok());
            }
        }
    }

    #[test]
    fn test_self_scoped_actions() {
        let actions = [
            Action::RetractRating,
            Action::ViewUser,
            Action::ChangePassword,
        ];
        for action in actions {
            for role in [Role::NormalUser, Role::StoreOwner] {
                let who = identity(role);
                assert!(authorize(Some(&who), action, Some(who.id)).is_ok());
                assert_eq!(
                    authorize(Some(&who), action, Some(UserId::generate())),
                    Err(Denial::Forbidden)
                );
                assert_eq!(authorize(Some(&who), action, None), Err(Denial::Forbidden));
            }

            let admin = identity(Role::SystemAdmin);
            assert!(authorize(Some(&admin), action, Some(UserId::generate())).is_ok());
            assert!(authorize(Some(&admin), action, None).is_ok());
        }
    }

    #[test]
    fn test_allow_returns_the_requester() {
        let who = identity(Role::NormalUser);
        let allowed = authorize(Some(&who), Action::ListStores, None).unwrap();
        assert_eq!(allowed.id, who.id);
    }
}
