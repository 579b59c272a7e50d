//! Administrator and store-owner features against `PostgreSQL`.
//!
//! Run with: `cargo test -p store-ratings-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;

use store_ratings_core::{Role, UserId};
use store_ratings_integration_tests::{PASSWORD, TestApp};

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_admin_creates_accounts_and_stores(pool: PgPool) {
    let app = TestApp::new(pool);
    let admin = app
        .user(Role::SystemAdmin, "Administrator Of Everything", "root@example.com")
        .await;
    let token = app.token(&admin);

    let owner = app
        .send(
            Method::POST,
            "/api/admin/users",
            Some(&token),
            Some(json!({
                "name": "Owner Of The Corner Shop",
                "email": "owner@example.com",
                "password": PASSWORD,
                "role": "store_owner",
            })),
        )
        .await;
    assert_eq!(owner.status, StatusCode::CREATED);
    let owner_id = owner.body["user"]["id"].as_str().unwrap().to_owned();

    let store = app
        .send(
            Method::POST,
            "/api/admin/stores",
            Some(&token),
            Some(json!({
                "name": "Corner Shop",
                "email": "shop@example.com",
                "owner_id": owner_id,
            })),
        )
        .await;
    assert_eq!(store.status, StatusCode::CREATED);
    assert_eq!(store.body["store"]["owner_id"], owner_id.as_str());

    let missing_owner = app
        .send(
            Method::POST,
            "/api/admin/stores",
            Some(&token),
            Some(json!({ "name": "Orphan Shop", "owner_id": UserId::generate().to_string() })),
        )
        .await;
    assert_eq!(missing_owner.status, StatusCode::NOT_FOUND);

    let wrong_role = app
        .send(
            Method::POST,
            "/api/admin/stores",
            Some(&token),
            Some(json!({ "name": "Admin Shop", "owner_id": admin.id.to_string() })),
        )
        .await;
    assert_eq!(wrong_role.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_role.body["fields"][0]["field"], "owner_id");

    let counts = app.get("/api/admin/dashboard", &admin).await;
    assert_eq!(counts.status, StatusCode::OK);
    assert_eq!(counts.body, json!({ "users": 2, "stores": 1, "ratings": 0 }));
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_user_listing_filters_sorts_and_pages(pool: PgPool) {
    let app = TestApp::new(pool);
    let admin = app
        .user(Role::SystemAdmin, "Zed The Administrator", "zed@example.com")
        .await;
    app.user(Role::NormalUser, "Amy The Normal User Here", "amy@example.com")
        .await;
    app.user(Role::NormalUser, "Bea The Normal User Here", "bea@example.com")
        .await;
    app.user(Role::StoreOwner, "Cal The Store Owner Here", "cal@example.com")
        .await;

    let all = app.get("/api/admin/users", &admin).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["total"], 4);
    assert_eq!(all.body["users"][0]["email"], "amy@example.com");

    let normal = app
        .get("/api/admin/users?role=normal_user&sort=name&order=desc", &admin)
        .await;
    assert_eq!(normal.body["total"], 2);
    assert_eq!(normal.body["users"][0]["email"], "bea@example.com");

    let by_name = app.get("/api/admin/users?name=STORE%20owner", &admin).await;
    assert_eq!(by_name.body["total"], 1);
    assert_eq!(by_name.body["users"][0]["role"], "store_owner");

    let second_page = app.get("/api/admin/users?page=2&size=3", &admin).await;
    assert_eq!(second_page.body["total"], 4);
    assert_eq!(second_page.body["page"], 2);
    assert_eq!(second_page.body["users"].as_array().unwrap().len(), 1);

    let bad_role = app.get("/api/admin/users?role=superuser", &admin).await;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_store_listing_carries_both_ratings(pool: PgPool) {
    let app = TestApp::new(pool);
    let me = app
        .user(Role::NormalUser, "Browsing Normal User", "browser@example.com")
        .await;
    let other = app
        .user(Role::NormalUser, "Another Normal User Too", "another@example.com")
        .await;
    let bakery = app.store("Sunrise Bakery", None).await;
    app.store("Moonlight Books", None).await;

    app.rate(&me, &bakery, 4).await;
    app.rate(&other, &bakery, 1).await;

    let listing = app.get("/api/stores?qName=bakery", &me).await;
    assert_eq!(listing.status, StatusCode::OK);
    assert_eq!(listing.body["total"], 1);
    let store = &listing.body["stores"][0];
    assert_eq!(store["overall_rating"], "2.50");
    assert_eq!(store["user_rating"], 4);

    let by_rating = app.get("/api/stores?sort=rating&order=desc", &me).await;
    assert_eq!(by_rating.body["stores"][0]["name"], "Sunrise Bakery");
    assert_eq!(by_rating.body["stores"][1]["overall_rating"], "0.00");
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL"]
async fn test_owner_dashboard_and_detail(pool: PgPool) {
    let app = TestApp::new(pool);
    let owner = app
        .user(Role::StoreOwner, "Owner Of Two Good Shops", "owner@example.com")
        .await;
    let idle_owner = app
        .user(Role::StoreOwner, "Owner Of Nothing At All", "idle@example.com")
        .await;
    let rater = app
        .user(Role::NormalUser, "Frequent Shop Visitor", "visitor@example.com")
        .await;
    let first = app.store("First Good Shop", Some(owner.id)).await;
    let second = app.store("Second Good Shop", Some(owner.id)).await;
    app.store("Someone Else's Shop", None).await;

    app.rate(&rater, &first, 5).await;
    app.rate(&rater, &second, 2).await;

    let dashboard = app.get("/api/store-owner/dashboard", &owner).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["average"], "3.50");
    assert_eq!(dashboard.body["raters"].as_array().unwrap().len(), 2);
    assert_eq!(dashboard.body["stores"].as_array().unwrap().len(), 2);
    assert_eq!(dashboard.body["raters"][0]["user_name"], "Frequent Shop Visitor");

    let empty = app.get("/api/store-owner/dashboard", &idle_owner).await;
    assert_eq!(
        empty.body,
        json!({ "average": "0.00", "raters": [], "stores": [] })
    );

    let detail = app.get(&format!("/api/users/{}", owner.id), &owner).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["user"]["stores"].as_array().unwrap().len(), 2);

    let plain = app.get(&format!("/api/users/{}", rater.id), &rater).await;
    assert!(plain.body["user"].get("stores").is_none());

    let snooping = app.get(&format!("/api/users/{}", owner.id), &rater).await;
    assert_eq!(snooping.status, StatusCode::FORBIDDEN);
}
