//! Authentication error types.

use thiserror::Error;

use store_ratings_core::ValidationErrors;

use crate::db::RepositoryError;
use crate::services::credentials::CredentialError;

/// Errors that can occur during authentication and account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Submitted fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Wrong password or unknown email. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already uses this email (in any letter case).
    #[error("email already registered")]
    EmailTaken,

    /// The target account does not exist.
    #[error("user not found")]
    UserNotFound,

    /// A non-administrator changed a password without the old one.
    #[error("old password required")]
    OldPasswordRequired,

    /// A non-administrator supplied the wrong old password.
    #[error("old password incorrect")]
    OldPasswordIncorrect,

    /// Hashing or token signing failed.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
