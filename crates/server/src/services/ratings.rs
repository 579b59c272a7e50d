//! Rating submission, retraction and listing.

use sqlx::PgPool;
use thiserror::Error;

use store_ratings_core::query::{Page, RatingFilter, RatingFilterError, RatingQuery, RatingSort, Sort};
use store_ratings_core::validation::{self, ValidationErrors};
use store_ratings_core::{Average, Denial, Identity, StoreId, UserId};

use crate::db::RepositoryError;
use crate::db::ratings::{RatingRepository, STORE_FKEY, USER_FKEY};
use crate::models::{Paged, Rating, RatingEntry};

/// Errors from rating operations.
#[derive(Debug, Error)]
pub enum RatingError {
    /// Submitted fields failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The requester may not see what they asked for.
    #[error(transparent)]
    Denied(#[from] Denial),

    /// The rated store does not exist.
    #[error("store not found")]
    StoreNotFound,

    /// The requester's account no longer exists.
    #[error("account no longer exists")]
    AccountMissing,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<RatingFilterError> for RatingError {
    fn from(e: RatingFilterError) -> Self {
        match e {
            RatingFilterError::Invalid(errors) => Self::Validation(errors),
            RatingFilterError::Denied(denial) => Self::Denied(denial),
        }
    }
}

/// Rating service.
pub struct RatingService<'a> {
    ratings: RatingRepository<'a>,
}

impl<'a> RatingService<'a> {
    /// Create a new rating service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            ratings: RatingRepository::new(pool),
        }
    }

    /// Create or replace the requester's rating of `store`.
    ///
    /// Returns the stored rating and the store's average after the write.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::Validation` if the score is missing or outside 1-5.
    /// Returns `RatingError::StoreNotFound` if the store does not exist.
    /// Returns `RatingError::AccountMissing` if the requester was deleted.
    pub async fn submit(
        &self,
        requester: &Identity,
        store: StoreId,
        score: Option<i64>,
        comment: Option<&str>,
    ) -> Result<(Rating, Average), RatingError> {
        let input = validation::rating(score, comment)?;

        let (rating, average) = self
            .ratings
            .upsert(requester.id, store, &input)
            .await
            .map_err(|e| match e {
                RepositoryError::MissingReference(key) if key == STORE_FKEY => {
                    RatingError::StoreNotFound
                }
                RepositoryError::MissingReference(key) if key == USER_FKEY => {
                    RatingError::AccountMissing
                }
                other => RatingError::Repository(other),
            })?;

        tracing::info!(
            user_id = %requester.id,
            store_id = %store,
            rating = %rating.rating,
            average = %average,
            "rating submitted"
        );
        Ok((rating, average))
    }

    /// Remove `user`'s rating of `store`. Removing nothing succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::Repository` if the delete fails.
    pub async fn retract(&self, user: UserId, store: StoreId) -> Result<(), RatingError> {
        if self.ratings.delete(user, store).await? {
            tracing::info!(user_id = %user, store_id = %store, "rating retracted");
        }
        Ok(())
    }

    /// List ratings visible to `requester`.
    ///
    /// Non-administrators only ever see their own ratings.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::Validation` for malformed ids or bounds.
    /// Returns `RatingError::Denied` when a non-administrator asks for
    /// another user's ratings.
    pub async fn list(
        &self,
        requester: &Identity,
        query: RatingQuery<'_>,
        sort: Sort<RatingSort>,
        page: Page,
    ) -> Result<Paged<RatingEntry>, RatingError> {
        let filter = RatingFilter::parse(requester, query)?;
        Ok(self.ratings.list(&filter, sort, page).await?)
    }
}
