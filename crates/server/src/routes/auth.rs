//! Login and self-registration.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use store_ratings_core::validation::UserInput;

use crate::error::AppError;
use crate::models::User;
use crate::services::AuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Signup and account-creation request body.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub address: Option<String>,
    #[serde(default)]
    pub password: String,
    /// Only read on administrator account creation.
    pub role: Option<String>,
}

impl UserRequest {
    pub(crate) fn input(&self) -> UserInput<'_> {
        UserInput {
            name: &self.name,
            email: &self.email,
            address: self.address.as_deref(),
            password: &self.password,
        }
    }
}

/// Response body carrying one account.
#[derive(Debug, Serialize)]
pub struct UserResponse<T> {
    pub user: T,
}

/// Exchange email and password for a session token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(body) = payload?;

    let outcome = AuthService::new(state.pool(), state.credentials())
        .login(&body.email, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        user: outcome.user,
    }))
}

/// Register a `normal_user` account.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse<User>>), AppError> {
    let Json(body) = payload?;

    let user = AuthService::new(state.pool(), state.credentials())
        .signup(&body.input())
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}
