//! Database operations for the ratings `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts, password hashes and roles
//! - `stores` - Rated stores, optionally owned by a `store_owner`
//! - `ratings` - One row per (user, store) pair
//!
//! Store averages are never stored; every read recomputes them with
//! `COALESCE(AVG(rating), 0)::numeric(10,2)`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p store-ratings-cli -- migrate
//! ```

pub mod dashboard;
pub mod ratings;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::{PgPool, Postgres, QueryBuilder};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use dashboard::DashboardRepository;
pub use ratings::RatingRepository;
pub use stores::StoreRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A foreign key pointed at a row that does not exist.
    #[error("missing referenced row: {0}")]
    MissingReference(String),
}

impl RepositoryError {
    /// Whether the failure is the database being unreachable rather than
    /// the query being wrong. Such failures are worth retrying.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            )
        )
    }
}

/// Classify constraint violations on a write.
///
/// Unique violations become `Conflict`, foreign key violations become
/// `MissingReference` carrying the constraint name.
pub(crate) fn map_write_error(e: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_owned();
            return RepositoryError::MissingReference(constraint);
        }
    }
    RepositoryError::Database(e)
}

/// Appends `WHERE`/`AND` clauses to a listing query as filters are present.
pub(crate) struct Conditions<'b, 'args> {
    builder: &'b mut QueryBuilder<'args, Postgres>,
    started: bool,
}

impl<'b, 'args> Conditions<'b, 'args> {
    pub(crate) const fn new(builder: &'b mut QueryBuilder<'args, Postgres>) -> Self {
        Self {
            builder,
            started: false,
        }
    }

    /// Start the next condition with `clause`; the caller binds its value.
    pub(crate) fn and(&mut self, clause: &str) -> &mut QueryBuilder<'args, Postgres> {
        self.builder
            .push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
        self.builder.push(clause)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    pool_options(max_connections)
        .connect(database_url.expose_secret())
        .await
}

/// Create a pool that connects on first use.
///
/// Used where the server must start (or a router must be built) before the
/// database is reachable.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_lazy_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    pool_options(max_connections)
        .min_connections(0)
        .connect_lazy(database_url.expose_secret())
}

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(max_connections.min(2))
        .acquire_timeout(Duration::from_secs(10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(RepositoryError::Database(sqlx::Error::PoolClosed).is_unavailable());
        assert!(!RepositoryError::Database(sqlx::Error::RowNotFound).is_unavailable());
        assert!(!RepositoryError::NotFound.is_unavailable());
        assert!(!RepositoryError::Conflict("email".to_owned()).is_unavailable());
    }

    #[test]
    fn test_conditions_join_with_and() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM users u");
        {
            let mut conditions = Conditions::new(&mut query);
            conditions.and("u.name ILIKE ").push_bind("%ann%");
            conditions.and("u.role = ").push_bind("store_owner");
        }
        assert_eq!(
            query.sql(),
            "SELECT 1 FROM users u WHERE u.name ILIKE $1 AND u.role = $2"
        );
    }

    #[test]
    fn test_no_conditions_leaves_query_untouched() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM stores s");
        let _ = Conditions::new(&mut query);
        assert_eq!(query.sql(), "SELECT 1 FROM stores s");
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = map_write_error(sqlx::Error::RowNotFound, "email already exists");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
