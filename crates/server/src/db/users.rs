//! User repository for database operations.
//!
//! Email lookups fold case with PostgreSQL's `lower()` on both sides, the
//! same function the unique index uses.

use sqlx::{PgPool, Postgres, QueryBuilder};

use store_ratings_core::query::{Page, Sort, UserFilter, UserSort};
use store_ratings_core::validation::NewUser;
use store_ratings_core::{Email, UserId};

use super::{Conditions, RepositoryError, map_write_error};
use crate::models::{Paged, User};

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.address, u.role, u.created_at";

/// A user together with the stored password hash.
#[derive(Debug, sqlx::FromRow)]
pub struct UserWithHash {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user and their password hash by email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_hash_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserWithHash>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHash>(&format!(
            "SELECT {USER_COLUMNS}, u.password_hash FROM users u WHERE lower(u.email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Get the stored password hash for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(hash)
    }

    /// Create a new user with an already-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists (in any case).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser, password_hash: &str) -> Result<User, RepositoryError> {
        let created = sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (name, email, address, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, address, role, created_at
            ",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.address.as_deref())
        .bind(password_hash)
        .bind(user.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "email already exists"))?;

        Ok(created)
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List users matching `filter`, one page at a time.
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
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users u"));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(sort.to_sql())
            .push(", u.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = query.build_query_as::<User>().fetch_all(self.pool).await?;

        Ok(Paged {
            total,
            page: page.number(),
            size: page.size(),
            items,
        })
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    let mut conditions = Conditions::new(builder);
    if let Some(name) = &filter.name {
        conditions.and("u.name ILIKE ").push_bind(name.clone());
    }
    if let Some(email) = &filter.email {
        conditions.and("u.email ILIKE ").push_bind(email.clone());
    }
    if let Some(address) = &filter.address {
        conditions.and("u.address ILIKE ").push_bind(address.clone());
    }
    if let Some(role) = filter.role {
        conditions.and("u.role = ").push_bind(role);
    }
}
