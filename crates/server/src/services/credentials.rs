//! Password hashing and session tokens.
//!
//! Passwords are stored as Argon2id PHC strings with a random per-password
//! salt. Session tokens are HS256 JWTs that carry the whole [`Identity`], so
//! validating a token needs no database round-trip.

use std::time::Duration;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use store_ratings_core::{Email, Identity, Role, UserId};

use crate::config::{PasswordHashConfig, TokenConfig};

/// Password verified when an account does not exist, so that unknown
/// emails and wrong passwords cost the same.
const DUMMY_PASSWORD: &str = "dummy-password-for-timing";

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Argon2 rejected the configured cost parameters.
    #[error("invalid password hash parameters: {0}")]
    InvalidParams(String),

    /// Hashing failed, or a stored hash could not be parsed.
    #[error("password hashing error: {0}")]
    Hashing(String),

    /// A token could not be signed.
    #[error("token signing error: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// A presented token is malformed, tampered with or expired.
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID.
    pub sub: UserId,
    pub email: Email,
    pub role: Role,
    pub name: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            name: claims.name,
        }
    }
}

/// Hashes and verifies passwords, issues and validates session tokens.
pub struct CredentialStore {
    argon2: Argon2<'static>,
    dummy_hash: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_lifetime: Duration,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("token_lifetime", &self.token_lifetime)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Build a credential store from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::InvalidParams` if Argon2 rejects the cost
    /// parameters, or `CredentialError::Hashing` if the dummy hash cannot be
    /// computed.
    pub fn new(token: &TokenConfig, hashing: PasswordHashConfig) -> Result<Self, CredentialError> {
        let params = Params::new(hashing.memory_kib, hashing.iterations, 1, None)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;

        let mut store = Self {
            argon2,
            dummy_hash: String::new(),
            encoding_key: EncodingKey::from_secret(token.secret_bytes()),
            decoding_key: DecodingKey::from_secret(token.secret_bytes()),
            validation,
            token_lifetime: token.lifetime,
        };
        store.dummy_hash = store.hash(DUMMY_PASSWORD)?;
        Ok(store)
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Hashing` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Check a password against a stored hash.
    ///
    /// The cost parameters embedded in `hash` are used, so hashes made
    /// under older settings keep verifying.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Hashing` if `hash` is not a valid PHC string.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Spend the same effort as [`CredentialStore::verify`] without an account.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }

    /// Issue a signed session token for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Signing` if the token cannot be encoded.
    pub fn issue_token(&self, identity: &Identity) -> Result<String, CredentialError> {
        let now = chrono::Utc::now().timestamp();
        let lifetime = i64::try_from(self.token_lifetime.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            name: identity.name.clone(),
            iat: now,
            exp: now.saturating_add(lifetime),
        };

        encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(CredentialError::Signing)
    }

    /// Validate a session token and return the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::InvalidToken` if the signature is wrong, the
    /// token is malformed, or it has expired.
    pub fn validate_token(&self, token: &str) -> Result<Identity, CredentialError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(CredentialError::InvalidToken)?;
        Ok(data.claims.into())
    }
}
