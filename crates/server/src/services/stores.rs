//! Store creation and browsing.

use sqlx::PgPool;
use thiserror::Error;

use store_ratings_core::query::{Page, Sort, StoreFilter, StoreSort};
use store_ratings_core::validation::{self, ValidationErrors};
use store_ratings_core::{Identity, Role, StoreId};

use crate::db::RepositoryError;
use crate::db::stores::StoreRepository;
use crate::db::users::UserRepository;
use crate::models::{Paged, Store, StoreSummary};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Submitted fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The named owner account does not exist.
    #[error("owner not found")]
    OwnerNotFound,

    /// The store does not exist.
    #[error("store not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fields for a new store, as submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreInput<'a> {
    pub name: &'a str,
    pub email: Option<&'a str>,
    pub address: Option<&'a str>,
    pub owner_id: Option<&'a str>,
}

/// Store service.
pub struct StoreService<'a> {
    stores: StoreRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> StoreService<'a> {
    /// Create a new store service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            stores: StoreRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// Create a store, optionally assigned to a `store_owner` account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` listing every invalid field, or
    /// citing `owner_id` when the owner is not a store owner.
    /// Returns `StoreError::OwnerNotFound` if the owner does not exist.
    pub async fn create(&self, input: StoreInput<'_>) -> Result<Store, StoreError> {
        let new_store =
            validation::new_store(input.name, input.email, input.address, input.owner_id)?;

        if let Some(owner_id) = new_store.owner_id {
            let owner = self
                .users
                .get_by_id(owner_id)
                .await?
                .ok_or(StoreError::OwnerNotFound)?;
            if owner.role != Role::StoreOwner {
                return Err(ValidationErrors::single(
                    "owner_id",
                    "owner must have the store_owner role",
                )
                .into());
            }
        }

        let store = self.stores.create(&new_store).await.map_err(|e| match e {
            RepositoryError::MissingReference(_) => StoreError::OwnerNotFound,
            other => StoreError::Repository(other),
        })?;

        tracing::info!(store_id = %store.id, owner_id = ?store.owner_id, "store created");
        Ok(store)
    }

    /// One store with its aggregates as seen by `requester`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store does not exist.
    pub async fn get(&self, requester: &Identity, id: StoreId) -> Result<StoreSummary, StoreError> {
        self.stores
            .get_summary(id, requester.id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Browse stores with aggregates as seen by `requester`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn list(
        &self,
        requester: &Identity,
        filter: &StoreFilter,
        sort: Sort<StoreSort>,
        page: Page,
    ) -> Result<Paged<StoreSummary>, StoreError> {
        Ok(self.stores.list(filter, requester.id, sort, page).await?)
    }
}
