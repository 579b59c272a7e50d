//! Core types for Store Ratings.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod role;
pub mod score;

pub use email::{Email, EmailError};
pub use id::*;
pub use role::{Role, RoleError};
pub use score::{Average, Score, ScoreError};
