//! Store Ratings Core - Shared types and decisions.
//!
//! This crate provides the I/O-free pieces of the rating service, shared by:
//! - `server` - HTTP API over `PostgreSQL`
//! - `cli` - Migrations and administrator bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no database
//! access, no HTTP. Everything here can be tested exhaustively without a
//! running service.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, roles, scores and averages
//! - [`identity`] - The authenticated requester passed into every operation
//! - [`policy`] - The single access-control decision function
//! - [`validation`] - Field-level input validation
//! - [`query`] - Filter, sort and pagination parameters for listings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod identity;
pub mod policy;
pub mod query;
pub mod types;
pub mod validation;

pub use identity::Identity;
pub use policy::{Action, Denial, Requirement, authorize};
pub use types::*;
pub use validation::{FieldError, ValidationErrors};
