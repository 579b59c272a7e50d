//! Session token extraction.
//!
//! The token may arrive as `Authorization: Bearer <token>`, as a bare
//! `Authorization` value, or in the `token` cookie, checked in that order.
//! Handlers receive the identity as an [`OptionalAuth`] and hand it to
//! `policy::authorize`, which turns a missing identity into a 401.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use store_ratings_core::Identity;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Cookie that may carry the session token.
pub const TOKEN_COOKIE: &str = "token";

/// Extractor for the requester's identity, if a token was presented.
///
/// A missing token yields `None`. A token that is present but malformed,
/// tampered with or expired is rejected with 401.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_headers(&parts.headers) else {
            return Ok(Self(None));
        };

        let identity = state.credentials().validate_token(&token).map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            AppError::from(e)
        })?;

        set_sentry_user(&identity);
        Ok(Self(Some(identity)))
    }
}

/// Find the session token in the request headers.
fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
                .unwrap_or(value)
                .trim()
        })
        .filter(|token| !token.is_empty());

    from_authorization
        .map(str::to_owned)
        .or_else(|| cookie_value(headers, TOKEN_COOKIE))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_owned())
        })
}
