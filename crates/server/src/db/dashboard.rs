//! Read-only aggregates for the administrator and store-owner dashboards.

use sqlx::PgPool;

use store_ratings_core::{Average, UserId};

use super::RepositoryError;
use super::stores::owned_stores;
use crate::models::{AdminCounts, OwnerDashboard, Rater};

/// Repository for dashboard queries.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Count users, stores and ratings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_counts(&self) -> Result<AdminCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, AdminCounts>(
            r"
            SELECT (SELECT COUNT(*) FROM users) AS users,
                   (SELECT COUNT(*) FROM stores) AS stores,
                   (SELECT COUNT(*) FROM ratings) AS ratings
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(counts)
    }

    /// Feedback across every store owned by `owner`.
    ///
    /// The three reads share one repeatable-read snapshot so the overall
    /// average, the per-store averages and the rater list always agree.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn owner_dashboard(&self, owner: UserId) -> Result<OwnerDashboard, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let average = sqlx::query_scalar::<_, Average>(
            r"
            SELECT COALESCE(AVG(r.rating), 0)::numeric(10,2)
            FROM ratings r
            JOIN stores s ON s.id = r.store_id
            WHERE s.owner_id = $1
            ",
        )
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;

        let raters = sqlx::query_as::<_, Rater>(
            r"
            SELECT r.user_id, u.name AS user_name, r.rating,
                   r.store_id, s.name AS store_name
            FROM ratings r
            JOIN stores s ON s.id = r.store_id
            JOIN users u ON u.id = r.user_id
            WHERE s.owner_id = $1
            ORDER BY r.updated_at DESC, r.id ASC
            ",
        )
        .bind(owner)
        .fetch_all(&mut *tx)
        .await?;

        let stores = owned_stores(&mut *tx, owner).await?;

        tx.commit().await?;

        Ok(OwnerDashboard {
            average,
            raters,
            stores,
        })
    }
}
