//! Rating listing.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};

use store_ratings_core::query::RatingQuery;
use store_ratings_core::{Action, authorize};

use super::Paging;
use crate::error::AppError;
use crate::middleware::OptionalAuth;
use crate::models::RatingEntry;
use crate::services::RatingService;
use crate::state::AppState;

/// Rating listing query.
#[derive(Debug, Default, Deserialize)]
pub struct RatingListQuery {
    pub user_id: Option<String>,
    pub store_id: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    #[serde(alias = "q")]
    pub comment: Option<String>,
    #[serde(flatten)]
    pub paging: Paging,
}

/// One page of ratings.
#[derive(Debug, Serialize)]
pub struct RatingPage {
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub ratings: Vec<RatingEntry>,
}

/// List ratings. Non-administrators see only their own.
pub async fn list(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    query: Result<Query<RatingListQuery>, QueryRejection>,
) -> Result<Json<RatingPage>, AppError> {
    let requester = authorize(identity.as_ref(), Action::ListRatings, None)?;
    let Query(query) = query?;
    let page = query.paging.page()?;

    let paged = RatingService::new(state.pool())
        .list(
            requester,
            RatingQuery {
                user_id: query.user_id.as_deref(),
                store_id: query.store_id.as_deref(),
                min: query.min.as_deref(),
                max: query.max.as_deref(),
                comment: query.comment.as_deref(),
            },
            query.paging.sort(),
            page,
        )
        .await?;

    Ok(Json(RatingPage {
        total: paged.total,
        page: paged.page,
        size: paged.size,
        ratings: paged.items,
    }))
}
