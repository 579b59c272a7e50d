//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness check
//! GET    /health/ready                - Readiness check (database)
//!
//! # Auth
//! POST   /api/auth/signup             - Register a normal user
//! POST   /api/auth/login              - Exchange credentials for a token
//!
//! # Admin (system_admin)
//! POST   /api/admin/users             - Create an account with any role
//! GET    /api/admin/users             - List and filter accounts
//! POST   /api/admin/stores            - Create a store
//! GET    /api/admin/dashboard         - Global counts
//!
//! # Stores (authenticated)
//! GET    /api/stores                  - Browse stores with ratings
//! GET    /api/stores/{id}             - Store detail
//! POST   /api/stores/{id}/rating      - Create or replace own rating
//! DELETE /api/stores/{id}/rating      - Retract a rating
//!
//! # Ratings (authenticated)
//! GET    /api/ratings                 - List ratings (own only unless admin)
//!
//! # Users (self or admin)
//! GET    /api/users/{id}              - Account detail
//! PUT    /api/users/{id}/password     - Change password
//!
//! # Store owner (store_owner)
//! GET    /api/store-owner/dashboard   - Ratings across owned stores
//! ```
//!
//! Every handler runs `policy::authorize` before touching storage.

pub mod admin;
pub mod auth;
pub mod ratings;
pub mod store_owner;
pub mod stores;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post, put},
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use store_ratings_core::ValidationErrors;
use store_ratings_core::query::{Page, Sort, SortKey};

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Sort and pagination parameters shared by every listing.
#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

impl Paging {
    /// The requested page, clamped to valid bounds.
    ///
    /// # Errors
    ///
    /// Returns an error citing `page` or `size` when either is not an integer.
    pub fn page(&self) -> Result<Page, ValidationErrors> {
        Page::parse(self.page.as_deref(), self.size.as_deref())
    }

    /// The requested sort; unknown columns fall back to the listing default.
    #[must_use]
    pub fn sort<K: SortKey>(&self) -> Sort<K> {
        Sort::parse(self.sort.as_deref(), self.order.as_deref())
    }
}

/// Create the API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route("/admin/stores", post(admin::create_store))
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/stores", get(stores::list))
        .route("/stores/{id}", get(stores::view))
        .route(
            "/stores/{id}/rating",
            post(stores::submit_rating).delete(stores::retract_rating),
        )
        .route("/ratings", get(ratings::list))
        .route("/users/{id}", get(users::view))
        .route("/users/{id}/password", put(users::change_password))
        .route("/store-owner/dashboard", get(store_owner::dashboard))
}

/// Build the complete application: routes, middleware and Sentry layers.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use store_ratings_core::{Email, Identity, Role, StoreId, UserId};

    use super::*;
    use crate::config::ServerConfig;
    use crate::db::create_lazy_pool;
    use crate::middleware::REQUEST_ID_HEADER;

    /// State over a pool that is never connected; every request below is
    /// answered before storage would be touched.
    fn test_state() -> AppState {
        let vars = HashMap::from([
            ("DATABASE_URL", "postgres://nobody@127.0.0.1:1/unused"),
            ("JWT_SECRET", "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
            ("PASSWORD_HASH_MEMORY_KIB", "1024"),
            ("PASSWORD_HASH_ITERATIONS", "1"),
        ]);
        let config =
            ServerConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned())).unwrap();
        let pool = create_lazy_pool(&config.database_url, 1).unwrap();
        AppState::new(config, pool).unwrap()
    }

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::generate(),
            email: Email::parse("tester@example.com").unwrap(),
            role,
            name: "Tester With A Long Name".to_owned(),
        }
    }

    fn token(state: &AppState, who: &Identity) -> String {
        state.credentials().issue_token(who).unwrap()
    }

    async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    fn field_names(body: &Value) -> Vec<&str> {
        body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state();
        let response = app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_a_token() {
        let state = test_state();
        let store = StoreId::generate();
        for (method, uri) in [
            (Method::GET, "/api/admin/users".to_owned()),
            (Method::GET, "/api/admin/dashboard".to_owned()),
            (Method::GET, "/api/stores".to_owned()),
            (Method::GET, "/api/ratings".to_owned()),
            (Method::GET, "/api/store-owner/dashboard".to_owned()),
            (Method::DELETE, format!("/api/stores/{store}/rating")),
        ] {
            let (status, body) = send(&state, method, &uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body, json!({ "error": "Authentication required" }));
        }
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let state = test_state();
        let (status, _) = send(&state, Method::GET, "/api/stores", Some("not.a.token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_forbid_other_roles() {
        let state = test_state();
        for role in [Role::NormalUser, Role::StoreOwner] {
            let bearer = token(&state, &identity(role));
            for uri in ["/api/admin/users?role=system_admin", "/api/admin/dashboard"] {
                let (status, _) = send(&state, Method::GET, uri, Some(&bearer), None).await;
                assert_eq!(status, StatusCode::FORBIDDEN, "{role} {uri}");
            }
            let (status, _) = send(
                &state,
                Method::POST,
                "/api/admin/stores",
                Some(&bearer),
                Some(json!({ "name": "Corner Shop" })),
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn test_owner_dashboard_requires_store_owner() {
        let state = test_state();
        for role in [Role::NormalUser, Role::SystemAdmin] {
            let bearer = token(&state, &identity(role));
            let (status, _) = send(
                &state,
                Method::GET,
                "/api/store-owner/dashboard",
                Some(&bearer),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{role}");
        }
    }

    #[tokio::test]
    async fn test_foreign_ratings_are_forbidden() {
        let state = test_state();
        let bearer = token(&state, &identity(Role::NormalUser));
        let uri = format!("/api/ratings?user_id={}", UserId::generate());
        let (status, _) = send(&state, Method::GET, &uri, Some(&bearer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_rating_bounds_are_validated() {
        let state = test_state();
        let bearer = token(&state, &identity(Role::NormalUser));
        let (status, body) = send(
            &state,
            Method::GET,
            "/api/ratings?min=0&max=9",
            Some(&bearer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(field_names(&body), ["min", "max"]);
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_rating() {
        let state = test_state();
        let bearer = token(&state, &identity(Role::NormalUser));
        let uri = format!("/api/stores/{}/rating", StoreId::generate());
        let (status, body) = send(
            &state,
            Method::POST,
            &uri,
            Some(&bearer),
            Some(json!({ "rating": 6 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(field_names(&body), ["rating"]);
    }

    #[tokio::test]
    async fn test_other_users_are_off_limits() {
        let state = test_state();
        let bearer = token(&state, &identity(Role::StoreOwner));
        let other = UserId::generate();

        let (status, _) = send(
            &state,
            Method::GET,
            &format!("/api/users/{other}"),
            Some(&bearer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &state,
            Method::PUT,
            &format!("/api/users/{other}/password"),
            Some(&bearer),
            Some(json!({ "oldPassword": "Secret#123", "newPassword": "Secret#456" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &state,
            Method::DELETE,
            &format!("/api/stores/{}/rating?user_id={other}", StoreId::generate()),
            Some(&bearer),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_malformed_user_id() {
        let state = test_state();

        let bearer = token(&state, &identity(Role::NormalUser));
        let (status, _) = send(&state, Method::GET, "/api/users/42", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let bearer = token(&state, &identity(Role::SystemAdmin));
        let (status, body) =
            send(&state, Method::GET, "/api/users/42", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(field_names(&body), ["user_id"]);
    }

    #[tokio::test]
    async fn test_create_user_reports_every_field() {
        let state = test_state();
        let bearer = token(&state, &identity(Role::SystemAdmin));
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/admin/users",
            Some(&bearer),
            Some(json!({
                "name": "Too Short",
                "email": "new.user@example.com",
                "password": "Secret#123",
                "role": "superuser",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields = field_names(&body);
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"role"));
    }

    #[tokio::test]
    async fn test_signup_and_login_validate_before_storage() {
        let state = test_state();
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({ "name": "Short", "email": "nope", "password": "weak" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(field_names(&body), ["name", "email", "password"]);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "not-an-email", "password": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(field_names(&body), ["email", "password"]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_validation_error() {
        let state = test_state();
        let request = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let state = test_state();

        let request = Request::get("/health")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())
            .unwrap();
        let response = app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");

        let response = app(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let state = test_state();
        for uri in ["/health", "/api/stores"] {
            let response = app(state.clone())
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let headers = response.headers();
            assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff", "{uri}");
            assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY", "{uri}");
            assert_eq!(headers[header::REFERRER_POLICY], "no-referrer", "{uri}");
            assert_eq!(headers[header::CACHE_CONTROL], "no-store", "{uri}");
            assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
        }
    }

    #[tokio::test]
    async fn test_malformed_query_is_checked_after_authorization() {
        let state = test_state();
        let store = StoreId::generate();
        let uris = [
            "/api/stores?name=a&name=b".to_owned(),
            "/api/ratings?comment=a&comment=b".to_owned(),
            "/api/admin/users?role=a&role=b".to_owned(),
        ];

        for uri in &uris {
            let (status, body) = send(&state, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body, json!({ "error": "Authentication required" }));
        }

        let bearer = token(&state, &identity(Role::SystemAdmin));
        for uri in &uris {
            let (status, body) = send(&state, Method::GET, uri, Some(&bearer), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(field_names(&body), ["query"]);
        }

        let bearer = token(&state, &identity(Role::NormalUser));
        let uri = format!("/api/stores/{store}/rating?user_id=a&user_id=b");
        let (status, body) = send(&state, Method::DELETE, &uri, Some(&bearer), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(field_names(&body), ["query"]);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let state = test_state();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/stores")
            .header(header::ORIGIN, "https://ratings.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
