//! Account listing and detail.

use sqlx::PgPool;

use store_ratings_core::query::{Page, Sort, UserFilter, UserSort};
use store_ratings_core::{Role, UserId};

use crate::db::RepositoryError;
use crate::db::stores::StoreRepository;
use crate::db::users::UserRepository;
use crate::models::{Paged, User, UserDetail};

/// User service.
pub struct UserService<'a> {
    users: UserRepository<'a>,
    stores: StoreRepository<'a>,
}

impl<'a> UserService<'a> {
    /// Create a new user service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            stores: StoreRepository::new(pool),
        }
    }

    /// List accounts matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &UserFilter,
        sort: Sort<UserSort>,
        page: Page,
    ) -> Result<Paged<User>, RepositoryError> {
        self.users.list(filter, sort, page).await
    }

    /// One account. Store owners come with the stores they own.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn detail(&self, id: UserId) -> Result<UserDetail, RepositoryError> {
        let user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let stores = if user.role == Role::StoreOwner {
            Some(self.stores.owned_by(user.id).await?)
        } else {
            None
        };

        Ok(UserDetail { user, stores })
    }
}
