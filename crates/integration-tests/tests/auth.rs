//! Signup, login and password changes against `PostgreSQL`.
//!
//! Run with: `cargo test -p store-ratings-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;

use store_ratings_core::Role;
use store_ratings_integration_tests::{PASSWORD, TestApp};

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_signup_then_login(pool: PgPool) {
    let app = TestApp::new(pool);

    let signup = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "name": "New Signup Person",
                "email": "Signup@Example.com",
                "address": "12 Long Road",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(signup.status, StatusCode::CREATED);
    assert_eq!(signup.body["user"]["role"], "normal_user");
    assert!(signup.body["user"].get("password_hash").is_none());

    let login = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "signup@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["user"]["id"], signup.body["user"]["id"]);

    let token = login.body["token"].as_str().unwrap();
    let stores = app.send(Method::GET, "/api/stores", Some(token), None).await;
    assert_eq!(stores.status, StatusCode::OK);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_login_with_non_ascii_email(pool: PgPool) {
    let app = TestApp::new(pool);
    let who = app
        .user(Role::NormalUser, "Emile Accented Tester", "Émile.Tester@Example.io")
        .await;

    for email in ["Émile.Tester@Example.io", "Émile.Tester@EXAMPLE.IO"] {
        let login = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{email}");
        assert_eq!(login.body["user"]["id"], who.id.to_string());
    }
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_duplicate_email_ignores_case(pool: PgPool) {
    let app = TestApp::new(pool);
    app.user(Role::NormalUser, "Original Account Holder", "taken@example.com")
        .await;

    let response = app
        .send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "name": "Second Account Holder",
                "email": "TAKEN@example.com",
                "password": PASSWORD,
            })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_login_failures_are_indistinguishable(pool: PgPool) {
    let app = TestApp::new(pool);
    app.user(Role::NormalUser, "Account With A Password", "known@example.com")
        .await;

    let wrong_password = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "known@example.com", "password": "Wrong#123" })),
        )
        .await;
    let unknown_email = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "unknown@example.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status, unknown_email.status);
    assert_eq!(wrong_password.body, unknown_email.body);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_password_change_rules(pool: PgPool) {
    let app = TestApp::new(pool);
    let user = app
        .user(Role::NormalUser, "Password Changing User", "changer@example.com")
        .await;
    let admin = app
        .user(Role::SystemAdmin, "Password Resetting Admin", "resetter@example.com")
        .await;
    let uri = format!("/api/users/{}/password", user.id);
    let user_token = app.token(&user);

    let missing = app
        .send(
            Method::PUT,
            &uri,
            Some(&user_token),
            Some(json!({ "newPassword": "Fresh#456" })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["fields"][0]["field"], "old_password");

    let wrong = app
        .send(
            Method::PUT,
            &uri,
            Some(&user_token),
            Some(json!({ "oldPassword": "Wrong#123", "newPassword": "Fresh#456" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);

    let changed = app
        .send(
            Method::PUT,
            &uri,
            Some(&user_token),
            Some(json!({ "oldPassword": PASSWORD, "newPassword": "Fresh#456" })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    let reset = app
        .send(
            Method::PUT,
            &uri,
            Some(&app.token(&admin)),
            Some(json!({ "new_password": "Reset#789" })),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);

    let login = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "changer@example.com", "password": "Reset#789" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_password_change_for_missing_user(pool: PgPool) {
    let app = TestApp::new(pool);
    let admin = app
        .user(Role::SystemAdmin, "Administrator Looking Around", "looker@example.com")
        .await;

    let response = app
        .send(
            Method::PUT,
            &format!("/api/users/{}/password", store_ratings_core::UserId::generate()),
            Some(&app.token(&admin)),
            Some(json!({ "newPassword": "Fresh#456" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
