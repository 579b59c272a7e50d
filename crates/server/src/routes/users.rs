//! Account detail and password changes.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use store_ratings_core::validation;
use store_ratings_core::{Action, UserId, authorize};

use super::auth::UserResponse;
use crate::error::AppError;
use crate::middleware::OptionalAuth;
use crate::models::UserDetail;
use crate::services::{AuthService, UserService};
use crate::state::AppState;

/// Password change request body.
#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    #[serde(alias = "oldPassword")]
    pub old_password: Option<String>,
    #[serde(alias = "newPassword", default)]
    pub new_password: String,
}

/// Acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// One account. Store owners include their stores.
pub async fn view(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<UserResponse<UserDetail>>, AppError> {
    let id = validation::id::<UserId>("user_id", &id);
    authorize(identity.as_ref(), Action::ViewUser, id.as_ref().ok().copied())?;
    let id = id?;

    let user = UserService::new(state.pool()).detail(id).await?;
    Ok(Json(UserResponse { user }))
}

/// Change an account's password.
pub async fn change_password(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<String>,
    payload: Result<Json<PasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = validation::id::<UserId>("user_id", &id);
    let requester = authorize(
        identity.as_ref(),
        Action::ChangePassword,
        id.as_ref().ok().copied(),
    )?;
    let id = id?;
    let Json(body) = payload?;

    AuthService::new(state.pool(), state.credentials())
        .change_password(
            requester,
            id,
            body.old_password.as_deref(),
            &body.new_password,
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated",
    }))
}
