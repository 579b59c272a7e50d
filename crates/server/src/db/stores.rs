//! Store repository for database operations.
//!
//! Every read that returns an overall rating computes it in the same query
//! from the current `ratings` rows.

use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use store_ratings_core::query::{Page, Sort, StoreFilter, StoreSort};
use store_ratings_core::validation::NewStore;
use store_ratings_core::{StoreId, UserId};

use super::{Conditions, RepositoryError, map_write_error};
use crate::models::{OwnedStore, Paged, Store, StoreSummary};

/// Store columns plus aggregates. Expects `$1` (or the first bind) to be
/// the requester's id for `user_rating`.
const SUMMARY_SELECT: &str = r"
    SELECT s.id, s.name, s.email, s.address, s.owner_id, s.created_at,
           COALESCE(AVG(r.rating), 0)::numeric(10,2) AS overall_rating,
           (SELECT ur.rating FROM ratings ur
             WHERE ur.store_id = s.id AND ur.user_id = ";

const SUMMARY_FROM: &str = ") AS user_rating
    FROM stores s
    LEFT JOIN ratings r ON r.store_id = s.id";

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::MissingReference` if the owner was deleted
    /// concurrently.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        let created = sqlx::query_as::<_, Store>(
            r"
            INSERT INTO stores (name, email, address, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, address, owner_id, created_at
            ",
        )
        .bind(&store.name)
        .bind(store.email.as_ref())
        .bind(store.address.as_deref())
        .bind(store.owner_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "store already exists"))?;

        Ok(created)
    }

    /// Get a store with its overall rating and the requester's own rating.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_summary(
        &self,
        id: StoreId,
        requester: UserId,
    ) -> Result<Option<StoreSummary>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        query
            .push_bind(requester)
            .push(SUMMARY_FROM)
            .push(" WHERE s.id = ")
            .push_bind(id)
            .push(" GROUP BY s.id");

        let store = query
            .build_query_as::<StoreSummary>()
            .fetch_optional(self.pool)
            .await?;

        Ok(store)
    }

    /// List stores matching `filter` with aggregates, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &StoreFilter,
        requester: UserId,
        sort: Sort<StoreSort>,
        page: Page,
    ) -> Result<Paged<StoreSummary>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM stores s");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        query.push_bind(requester).push(SUMMARY_FROM);
        push_filters(&mut query, filter);
        query
            .push(" GROUP BY s.id ORDER BY ")
            .push(sort.to_sql())
            .push(", s.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query
            .build_query_as::<StoreSummary>()
            .fetch_all(self.pool)
            .await?;

        Ok(Paged {
            total,
            page: page.number(),
            size: page.size(),
            items,
        })
    }

    /// Stores owned by `owner`, with averages, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owned_by(&self, owner: UserId) -> Result<Vec<OwnedStore>, RepositoryError> {
        owned_stores(self.pool, owner).await
    }
}

/// Stores owned by `owner` on any executor, so dashboard reads can share a
/// transaction.
pub(crate) async fn owned_stores<'e, E>(
    executor: E,
    owner: UserId,
) -> Result<Vec<OwnedStore>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let stores = sqlx::query_as::<_, OwnedStore>(
        r"
        SELECT s.id, s.name, s.address,
               COALESCE(AVG(r.rating), 0)::numeric(10,2) AS average
        FROM stores s
        LEFT JOIN ratings r ON r.store_id = s.id
        WHERE s.owner_id = $1
        GROUP BY s.id
        ORDER BY s.name ASC, s.id ASC
        ",
    )
    .bind(owner)
    .fetch_all(executor)
    .await?;

    Ok(stores)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &StoreFilter) {
    let mut conditions = Conditions::new(builder);
    if let Some(name) = &filter.name {
        conditions.and("s.name ILIKE ").push_bind(name.clone());
    }
    if let Some(address) = &filter.address {
        conditions.and("s.address ILIKE ").push_bind(address.clone());
    }
}
