//! Unified error handling with Sentry integration.
//!
//! Every layer's error converts into [`AppError`], which picks the status
//! code and JSON body. Server-side failures are captured to Sentry and
//! logged in full; the client only sees a generic message for them.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use store_ratings_core::{Denial, Identity, ValidationErrors};

use crate::db::RepositoryError;
use crate::services::{AuthError, CredentialError, RatingError, StoreError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// One or more request fields were rejected.
    #[error(transparent)]
    Validation(ValidationErrors),

    /// No valid identity, or a failed login.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The identity may not perform this action.
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("{0}")]
    NotFound(&'static str),

    /// The request collides with existing data.
    #[error("{0}")]
    Conflict(&'static str),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Validation(errors) => json!({
                "error": "Validation failed",
                "fields": errors.fields(),
            }),
            Self::Database(_) if status == StatusCode::SERVICE_UNAVAILABLE => {
                json!({ "error": "Service temporarily unavailable" })
            }
            Self::Database(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(ValidationErrors::single("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(ValidationErrors::single("query", rejection.body_text()))
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => Self::Unauthorized("Authentication required"),
            Denial::Forbidden => Self::Forbidden,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound("Not found"),
            other => Self::Database(other),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::InvalidToken(_) => Self::Unauthorized("Invalid or expired token"),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(errors) => Self::Validation(errors),
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid email or password"),
            AuthError::EmailTaken => Self::Conflict("Email already registered"),
            AuthError::UserNotFound => Self::NotFound("User not found"),
            AuthError::OldPasswordRequired => Self::Validation(ValidationErrors::single(
                "old_password",
                "old password is required",
            )),
            AuthError::OldPasswordIncorrect => Self::Validation(ValidationErrors::single(
                "old_password",
                "old password is incorrect",
            )),
            AuthError::Credential(e) => e.into(),
            AuthError::Repository(e) => e.into(),
        }
    }
}

impl From<RatingError> for AppError {
    fn from(e: RatingError) -> Self {
        match e {
            RatingError::Validation(errors) => Self::Validation(errors),
            RatingError::Denied(denial) => denial.into(),
            RatingError::StoreNotFound => Self::NotFound("Store not found"),
            RatingError::AccountMissing => Self::Unauthorized("Account no longer exists"),
            RatingError::Repository(e) => e.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(errors) => Self::Validation(errors),
            StoreError::OwnerNotFound => Self::NotFound("Owner not found"),
            StoreError::NotFound => Self::NotFound("Store not found"),
            StoreError::Repository(e) => e.into(),
        }
    }
}

/// Set the Sentry user context from an authenticated identity.
pub fn set_sentry_user(identity: &Identity) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(identity.id.to_string()),
            email: Some(identity.email.to_string()),
            ..Default::default()
        }));
    });
}
