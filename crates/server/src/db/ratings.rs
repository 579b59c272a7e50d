//! Rating repository for database operations.
//!
//! A user's rating of a store is written with a single
//! `INSERT ... ON CONFLICT (user_id, store_id) DO UPDATE` statement, so
//! concurrent submissions for the same pair can never create a second row.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use store_ratings_core::query::{Page, RatingFilter, RatingSort, Sort};
use store_ratings_core::validation::RatingInput;
use store_ratings_core::{Average, Email, RatingId, Score, StoreId, UserId};

use super::{Conditions, RepositoryError, map_write_error};
use crate::models::{Paged, RatedStore, Rating, RatingAuthor, RatingEntry};

/// Foreign key from `ratings.store_id` to `stores.id`.
pub const STORE_FKEY: &str = "ratings_store_id_fkey";
/// Foreign key from `ratings.user_id` to `users.id`.
pub const USER_FKEY: &str = "ratings_user_id_fkey";

const ENTRY_SELECT: &str = r"
    SELECT r.id, r.user_id, r.store_id, r.rating, r.comment, r.created_at, r.updated_at,
           u.name AS user_name, u.email AS user_email,
           s.name AS store_name, s.email AS store_email, s.address AS store_address
    FROM ratings r
    JOIN users u ON u.id = r.user_id
    JOIN stores s ON s.id = r.store_id";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for the joined rating listing.
#[derive(Debug, sqlx::FromRow)]
struct RatingEntryRow {
    id: RatingId,
    user_id: UserId,
    store_id: StoreId,
    rating: Score,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: String,
    user_email: Email,
    store_name: String,
    store_email: Option<Email>,
    store_address: Option<String>,
}

impl From<RatingEntryRow> for RatingEntry {
    fn from(row: RatingEntryRow) -> Self {
        Self {
            rating: Rating {
                id: row.id,
                user_id: row.user_id,
                store_id: row.store_id,
                rating: row.rating,
                comment: row.comment,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            user: RatingAuthor {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
            store: RatedStore {
                id: row.store_id,
                name: row.store_name,
                email: row.store_email,
                address: row.store_address,
            },
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for rating database operations.
pub struct RatingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingRepository<'a> {
    /// Create a new rating repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create or replace `user`'s rating of `store` and return it together
    /// with the store's new average.
    ///
    /// Both statements run in one transaction, so the returned average
    /// includes the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` naming [`STORE_FKEY`] if
    /// the store does not exist, or [`USER_FKEY`] if the user does not.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert(
        &self,
        user: UserId,
        store: StoreId,
        input: &RatingInput,
    ) -> Result<(Rating, Average), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rating = sqlx::query_as::<_, Rating>(
            r"
            INSERT INTO ratings (user_id, store_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, store_id) DO UPDATE
               SET rating = EXCLUDED.rating,
                   comment = EXCLUDED.comment,
                   updated_at = now()
            RETURNING id, user_id, store_id, rating, comment, created_at, updated_at
            ",
        )
        .bind(user)
        .bind(store)
        .bind(input.score)
        .bind(input.comment.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "rating already exists"))?;

        let average = average_for(&mut *tx, store).await?;

        tx.commit().await?;

        Ok((rating, average))
    }

    /// Delete `user`'s rating of `store`.
    ///
    /// Returns whether a row was removed; removing nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, user: UserId, store: StoreId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM ratings WHERE user_id = $1 AND store_id = $2")
            .bind(user)
            .bind(store)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The current average rating of a store (`0.00` when unrated).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn average(&self, store: StoreId) -> Result<Average, RepositoryError> {
        average_for(self.pool, store).await
    }

    /// List ratings matching `filter`, one page at a time.
    ///
    /// The filter's `user_id` must already be scoped to what the requester
    /// may see.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &RatingFilter,
        sort: Sort<RatingSort>,
        page: Page,
    ) -> Result<Paged<RatingEntry>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ratings r");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(sort.to_sql())
            .push(", r.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query
            .build_query_as::<RatingEntryRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(Paged {
            total,
            page: page.number(),
            size: page.size(),
            items: rows.into_iter().map(Into::into).collect(),
        })
    }
}

async fn average_for<'e, E>(executor: E, store: StoreId) -> Result<Average, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let average = sqlx::query_scalar::<_, Average>(
        "SELECT COALESCE(AVG(rating), 0)::numeric(10,2) FROM ratings WHERE store_id = $1",
    )
    .bind(store)
    .fetch_one(executor)
    .await?;

    Ok(average)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &RatingFilter) {
    let mut conditions = Conditions::new(builder);
    if let Some(user_id) = filter.user_id {
        conditions.and("r.user_id = ").push_bind(user_id);
    }
    if let Some(store_id) = filter.store_id {
        conditions.and("r.store_id = ").push_bind(store_id);
    }
    if let Some(min) = filter.min {
        conditions.and("r.rating >= ").push_bind(min);
    }
    if let Some(max) = filter.max {
        conditions.and("r.rating <= ").push_bind(max);
    }
    if let Some(comment) = &filter.comment {
        conditions.and("r.comment ILIKE ").push_bind(comment.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_filter_is_bound() {
        let filter = RatingFilter {
            user_id: Some(UserId::generate()),
            store_id: Some(StoreId::generate()),
            min: Score::new(2).ok(),
            max: Score::new(4).ok(),
            comment: Some("%friendly%".to_owned()),
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ratings r");
        push_filters(&mut query, &filter);
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM ratings r WHERE r.user_id = $1 AND r.store_id = $2 \
             AND r.rating >= $3 AND r.rating <= $4 AND r.comment ILIKE $5"
        );
    }

    #[test]
    fn test_unscoped_filter_has_no_where() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ratings r");
        push_filters(&mut query, &RatingFilter::default());
        assert_eq!(query.sql(), "SELECT COUNT(*) FROM ratings r");
    }
}
