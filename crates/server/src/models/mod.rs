//! Domain models returned by repositories and serialized by routes.
//!
//! Password hashes never appear on these types; the user repository hands
//! them out separately and only to the credential checks that need them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use store_ratings_core::{Average, Email, Identity, RatingId, Role, Score, StoreId, UserId};

/// An account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The identity this account authenticates as.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            name: self.name.clone(),
        }
    }
}

/// A store as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub email: Option<Email>,
    pub address: Option<String>,
    pub owner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A store with its aggregates, as seen by one requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StoreSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub store: Store,
    /// Mean of all current ratings, `0.00` when unrated.
    pub overall_rating: Average,
    /// The requester's own rating, if they have one.
    pub user_rating: Option<Score>,
}

/// One user's rating of one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub rating: Score,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who wrote a listed rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingAuthor {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// Which store a listed rating is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatedStore {
    pub id: StoreId,
    pub name: String,
    pub email: Option<Email>,
    pub address: Option<String>,
}

/// A rating joined with its author and store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingEntry {
    #[serde(flatten)]
    pub rating: Rating,
    pub user: RatingAuthor,
    pub store: RatedStore,
}

/// A store owned by the requester, with its average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OwnedStore {
    pub id: StoreId,
    pub name: String,
    pub address: Option<String>,
    pub average: Average,
}

/// A rating left on an owned store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Rater {
    pub user_id: UserId,
    pub user_name: String,
    pub rating: Score,
    pub store_id: StoreId,
    pub store_name: String,
}

/// Account detail. Store owners also get the stores they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stores: Option<Vec<OwnedStore>>,
}

/// Global counts for administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AdminCounts {
    pub users: i64,
    pub stores: i64,
    pub ratings: i64,
}

/// Feedback across every store a store owner owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerDashboard {
    /// Mean over every rating of every owned store.
    pub average: Average,
    pub raters: Vec<Rater>,
    pub stores: Vec<OwnedStore>,
}

/// One page of a listing plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub items: Vec<T>,
}
