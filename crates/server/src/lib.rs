//! Store Ratings server library.
//!
//! The HTTP API as a library, so the router can be built and exercised in
//! tests and the CLI can reuse the repositories and services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
