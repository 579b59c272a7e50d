//! Store browsing and rating endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use store_ratings_core::query::StoreFilter;
use store_ratings_core::validation;
use store_ratings_core::{Action, Average, StoreId, UserId, authorize};

use super::Paging;
use super::admin::StoreResponse;
use crate::error::AppError;
use crate::middleware::OptionalAuth;
use crate::models::{Rating, StoreSummary};
use crate::services::{RatingService, StoreService};
use crate::state::AppState;

/// Store listing query.
#[derive(Debug, Default, Deserialize)]
pub struct StoreListQuery {
    #[serde(alias = "qName")]
    pub name: Option<String>,
    #[serde(alias = "qAddress")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub paging: Paging,
}

/// One page of stores.
#[derive(Debug, Serialize)]
pub struct StorePage {
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub stores: Vec<StoreSummary>,
}

/// Rating submission body.
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// The stored rating and the store's new average.
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub rating: Rating,
    pub avg_rating: Average,
}

/// Retraction query. Administrators may name another user.
#[derive(Debug, Default, Deserialize)]
pub struct RetractQuery {
    pub user_id: Option<String>,
}

/// Browse stores with their overall rating and the requester's own.
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    query: Result<Query<StoreListQuery>, QueryRejection>,
) -> Result<Json<StorePage>, AppError> {
    let requester = authorize(identity.as_ref(), Action::ListStores, None)?;
    let Query(query) = query?;

    let filter = StoreFilter::parse(query.name.as_deref(), query.address.as_deref());
    let page = query.paging.page()?;

    let paged = StoreService::new(state.pool())
        .list(requester, &filter, query.paging.sort(), page)
        .await?;

    Ok(Json(StorePage {
        total: paged.total,
        page: paged.page,
        size: paged.size,
        stores: paged.items,
    }))
}

/// One store with aggregates.
pub async fn view(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<String>,
) -> Result<Json<StoreResponse<StoreSummary>>, AppError> {
    let requester = authorize(identity.as_ref(), Action::ViewStore, None)?;
    let id: StoreId = validation::id("store_id", &id)?;

    let store = StoreService::new(state.pool()).get(requester, id).await?;
    Ok(Json(StoreResponse { store }))
}

/// Create or replace the requester's rating of a store.
pub async fn submit_rating(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<String>,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> Result<Json<RatingResponse>, AppError> {
    let requester = authorize(identity.as_ref(), Action::SubmitRating, None)?;
    let store: StoreId = validation::id("store_id", &id)?;
    let Json(body) = payload?;

    let (rating, avg_rating) = RatingService::new(state.pool())
        .submit(requester, store, body.rating, body.comment.as_deref())
        .await?;

    Ok(Json(RatingResponse { rating, avg_rating }))
}

/// Remove a rating of a store. Succeeds when there was nothing to remove.
pub async fn retract_rating(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    Path(id): Path<String>,
    query: Result<Query<RetractQuery>, QueryRejection>,
) -> Result<StatusCode, AppError> {
    let requested = query
        .as_ref()
        .ok()
        .and_then(|Query(q)| q.user_id.as_deref())
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| validation::id::<UserId>("user_id", raw))
        .transpose();
    let owner = match &requested {
        Ok(Some(user)) => Some(*user),
        Ok(None) => identity.as_ref().map(|i| i.id),
        Err(_) => None,
    };
    let requester = authorize(identity.as_ref(), Action::RetractRating, owner)?;
    query?;
    let user = requested?.unwrap_or(requester.id);

    let store: StoreId = validation::id("store_id", &id)?;

    RatingService::new(state.pool()).retract(user, store).await?;
    Ok(StatusCode::NO_CONTENT)
}
