//! Store owner dashboard.

use axum::{Json, extract::State};

use store_ratings_core::{Action, authorize};

use crate::db::DashboardRepository;
use crate::error::AppError;
use crate::middleware::OptionalAuth;
use crate::models::OwnerDashboard;
use crate::state::AppState;

/// Ratings and averages across every store the requester owns.
pub async fn dashboard(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
) -> Result<Json<OwnerDashboard>, AppError> {
    let owner = authorize(identity.as_ref(), Action::StoreOwnerDashboard, None)?;

    let dashboard = DashboardRepository::new(state.pool())
        .owner_dashboard(owner.id)
        .await?;
    Ok(Json(dashboard))
}
