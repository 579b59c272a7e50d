//! Business logic services.
//!
//! Route handlers authorize the requester first, then call into these.
//!
//! # Services
//!
//! - `auth` - Signup, login, account creation, password changes
//! - `credentials` - Argon2id hashing and JWT session tokens
//! - `ratings` - Rating upsert, retraction and scoped listing
//! - `stores` - Store creation and browsing
//! - `users` - Account listing and detail

pub mod auth;
pub mod credentials;
pub mod ratings;
pub mod stores;
pub mod users;

pub use auth::{AuthError, AuthService, LoginOutcome};
pub use credentials::{CredentialError, CredentialStore};
pub use ratings::{RatingError, RatingService};
pub use stores::{StoreError, StoreInput, StoreService};
pub use users::UserService;
