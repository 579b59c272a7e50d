//! Authentication service.
//!
//! Provides signup, login, administrator account creation and password
//! changes. Callers gate access with `policy::authorize` first; this
//! service only validates input and talks to storage.

mod error;

pub use error::AuthError;

use sqlx::PgPool;

use store_ratings_core::validation::{self, UserInput, ValidationErrors};
use store_ratings_core::{Identity, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;
use crate::services::credentials::CredentialStore;

/// A successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    /// Signed session token.
    pub token: String,
    /// The account that logged in.
    pub user: User,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    credentials: &'a CredentialStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, credentials: &'a CredentialStore) -> Self {
        Self {
            users: UserRepository::new(pool),
            credentials,
        }
    }

    /// Register a new `normal_user` account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` listing every invalid field.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    pub async fn signup(&self, input: &UserInput<'_>) -> Result<User, AuthError> {
        let new_user = validation::signup(input)?;
        let user = self.insert(&new_user).await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Create an account with any role. The caller must be an administrator.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` listing every invalid field, including
    /// a missing or unknown role.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    pub async fn create_user(
        &self,
        input: &UserInput<'_>,
        role: Option<&str>,
    ) -> Result<User, AuthError> {
        let new_user = validation::managed_user(input, role)?;
        let user = self.insert(&new_user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    async fn insert(&self, new_user: &validation::NewUser) -> Result<User, AuthError> {
        let password_hash = self.credentials.hash(&new_user.password)?;

        self.users
            .create(new_user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// Unknown emails still run a password verification, so both failure
    /// paths take comparable time and return the same error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the fields are malformed.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let email = validation::login(email, password)?;

        let Some(found) = self.users.get_with_hash_by_email(&email).await? else {
            self.credentials.verify_dummy(password);
            tracing::warn!("login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.verify(password, &found.password_hash)? {
            tracing::warn!(user_id = %found.user.id, "login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.credentials.issue_token(&found.user.identity())?;
        Ok(LoginOutcome {
            token,
            user: found.user,
        })
    }

    /// Change `target`'s password on behalf of `requester`.
    ///
    /// Administrators may reset any password outright; everyone else must
    /// prove the old one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the new password is too weak.
    /// Returns `AuthError::UserNotFound` if `target` does not exist.
    /// Returns `AuthError::OldPasswordRequired` / `OldPasswordIncorrect` for
    /// non-administrators who omit or mistype the old password.
    pub async fn change_password(
        &self,
        requester: &Identity,
        target: UserId,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validation::password(new_password)
            .map_err(|message| ValidationErrors::single("new_password", message))?;

        let current_hash = self
            .users
            .get_password_hash(target)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !requester.is_admin() {
            let old = old_password
                .filter(|p| !p.is_empty())
                .ok_or(AuthError::OldPasswordRequired)?;
            if !self.credentials.verify(old, &current_hash)? {
                return Err(AuthError::OldPasswordIncorrect);
            }
        }

        let new_hash = self.credentials.hash(new_password)?;
        self.users
            .update_password(target, &new_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %target, changed_by = %requester.id, "password changed");
        Ok(())
    }
}
