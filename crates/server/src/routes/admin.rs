//! Administrator endpoints.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use store_ratings_core::query::UserFilter;
use store_ratings_core::{Action, authorize};

use super::Paging;
use super::auth::{UserRequest, UserResponse};
use crate::db::DashboardRepository;
use crate::error::AppError;
use crate::middleware::OptionalAuth;
use crate::models::{AdminCounts, Store, User};
use crate::services::{AuthService, StoreInput, StoreService, UserService};
use crate::state::AppState;

/// Store creation request body.
#[derive(Debug, Deserialize)]
pub struct StoreRequest {
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub owner_id: Option<String>,
}

/// Response body carrying one store.
#[derive(Debug, Serialize)]
pub struct StoreResponse<T> {
    pub store: T,
}

/// Account listing query.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    #[serde(flatten)]
    pub paging: Paging,
}

/// One page of accounts.
#[derive(Debug, Serialize)]
pub struct UserPage {
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub users: Vec<User>,
}

/// Create an account with any role.
pub async fn create_user(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    payload: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse<User>>), AppError> {
    authorize(identity.as_ref(), Action::CreateUser, None)?;
    let Json(body) = payload?;

    let user = AuthService::new(state.pool(), state.credentials())
        .create_user(&body.input(), body.role.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Create a store, optionally assigned to a store owner.
pub async fn create_store(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    payload: Result<Json<StoreRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoreResponse<Store>>), AppError> {
    authorize(identity.as_ref(), Action::CreateStore, None)?;
    let Json(body) = payload?;

    let store = StoreService::new(state.pool())
        .create(StoreInput {
            name: &body.name,
            email: body.email.as_deref(),
            address: body.address.as_deref(),
            owner_id: body.owner_id.as_deref(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(StoreResponse { store })))
}

/// List and filter accounts.
pub async fn list_users(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> Result<Json<UserPage>, AppError> {
    authorize(identity.as_ref(), Action::ListUsers, None)?;
    let Query(query) = query?;

    let filter = UserFilter::parse(
        query.name.as_deref(),
        query.email.as_deref(),
        query.address.as_deref(),
        query.role.as_deref(),
    )?;
    let page = query.paging.page()?;

    let paged = UserService::new(state.pool())
        .list(&filter, query.paging.sort(), page)
        .await?;

    Ok(Json(UserPage {
        total: paged.total,
        page: paged.page,
        size: paged.size,
        users: paged.items,
    }))
}

/// Global user, store and rating counts.
pub async fn dashboard(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
) -> Result<Json<AdminCounts>, AppError> {
    authorize(identity.as_ref(), Action::AdminDashboard, None)?;

    let counts = DashboardRepository::new(state.pool()).admin_counts().await?;
    Ok(Json(counts))
}
