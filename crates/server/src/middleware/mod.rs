//! HTTP middleware and extractors.
//!
//! # Middleware
//!
//! - `auth` - Session token extraction
//! - `request_id` - Request ID generation and propagation
//! - `security_headers` - Hardening headers on every response

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalAuth, TOKEN_COOKIE};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::{SECURITY_HEADERS, security_headers_middleware};
