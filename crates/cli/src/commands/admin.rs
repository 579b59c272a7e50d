//! Administrator bootstrap command.
//!
//! # Usage
//!
//! ```bash
//! SR_ADMIN_PASSWORD='Secret#123' sr-cli admin create -e admin@example.com -n "Site Administrator"
//! ```
//!
//! # Environment Variables
//!
//! - `SR_ADMIN_PASSWORD` - Password for the new account
//! - `DATABASE_URL`, `JWT_SECRET` and the password hashing settings, read
//!   the same way the server reads them

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use store_ratings_core::Role;
use store_ratings_core::validation::UserInput;
use store_ratings_server::config::{ConfigError, ServerConfig};
use store_ratings_server::db;
use store_ratings_server::services::{AuthError, AuthService, CredentialError, CredentialStore};

/// Environment variable holding the new administrator's password.
pub const PASSWORD_VAR: &str = "SR_ADMIN_PASSWORD";

/// Errors that can occur during administrator creation.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Server configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Credential store could not be built.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Validation failed or the account could not be stored.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create a `system_admin` account.
///
/// The password is taken from [`PASSWORD_VAR`] so it never appears in shell
/// history or the process list. The same field rules as
/// `POST /api/admin/users` apply.
///
/// # Errors
///
/// Returns `AdminError` if configuration is missing, a field is invalid, or
/// the email is already registered.
pub async fn create(email: &str, name: &str, address: Option<&str>) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();

    let password = std::env::var(PASSWORD_VAR)
        .map(SecretString::from)
        .map_err(|_| AdminError::MissingEnvVar(PASSWORD_VAR))?;

    let config = ServerConfig::from_env()?;
    let credentials = CredentialStore::new(&config.token, config.password_hash)?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url, 1).await?;

    let input = UserInput {
        name,
        email,
        address,
        password: password.expose_secret(),
    };
    let user = AuthService::new(&pool, &credentials)
        .create_user(&input, Some(Role::SystemAdmin.as_str()))
        .await?;

    tracing::info!(
        "Administrator created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}
