//! HTTP-level integration tests for the auth endpoints.
//!
//! Covers login, token refresh with rotation, logout, account lockout,
//! and inactive-account handling.

mod common;

use axum::http::StatusCode;
use common::{body_json, create_user, post_json, post_json_auth};
use sqlx::PgPool;

use salespulse_db::repositories::UserRepo;

/// Log in via the API and return the parsed JSON response.
async fn login(app: axum::Router, username: &str, password: &str) -> serde_json::Value {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_success_returns_tokens_and_user(pool: PgPool) {
    let (user, password) = create_user(&pool, "loginuser", "admin").await;
    let app = common::build_test_app(pool);

    let json = login(app, "loginuser", &password).await;

    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert!(json["expires_in"].is_number());
    assert_eq!(json["user"]["id"], user.id);
    assert_eq!(json["user"]["username"], "loginuser");
    assert_eq!(json["user"]["role"], "admin");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_wrong_password_unauthorized(pool: PgPool) {
    create_user(&pool, "wrongpw", "viewer").await;
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "username": "wrongpw", "password": "incorrect" });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_nonexistent_user_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "username": "ghost", "password": "whatever" });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_inactive_user_forbidden(pool: PgPool) {
    let (user, password) = create_user(&pool, "inactive", "viewer").await;
    UserRepo::deactivate(&pool, user.id)
        .await
        .expect("deactivation should succeed");
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "username": "inactive", "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_failures_lock_the_account(pool: PgPool) {
    let (_user, password) = create_user(&pool, "lockme", "viewer").await;
    let app = common::build_test_app(pool);

    for _ in 0..5 {
        let body = serde_json::json!({ "username": "lockme", "password": "bad-guess" });
        let response = post_json(app.clone(), "/api/v1/auth/login", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Even the correct password is rejected while locked.
    let body = serde_json::json!({ "username": "lockme", "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_tokens(pool: PgPool) {
    let (_user, password) = create_user(&pool, "refresher", "viewer").await;
    let app = common::build_test_app(pool);

    let login_json = login(app.clone(), "refresher", &password).await;
    let old_refresh = login_json["refresh_token"].as_str().unwrap().to_string();

    let body = serde_json::json!({ "refresh_token": old_refresh });
    let response = post_json(app.clone(), "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_ne!(
        json["refresh_token"].as_str().unwrap(),
        old_refresh,
        "refresh token must rotate on use"
    );

    // The consumed token is dead.
    let body = serde_json::json!({ "refresh_token": old_refresh });
    let response = post_json(app, "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_with_garbage_token_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);

    let body = serde_json::json!({ "refresh_token": "not-a-real-token" });
    let response = post_json(app, "/api/v1/auth/refresh", body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_refresh_sessions(pool: PgPool) {
    let (_user, password) = create_user(&pool, "leaver", "viewer").await;
    let app = common::build_test_app(pool);

    let login_json = login(app.clone(), "leaver", &password).await;
    let access = login_json["access_token"].as_str().unwrap();
    let refresh = login_json["refresh_token"].as_str().unwrap();

    let bearer = format!("Bearer {access}");
    let response = post_json_auth(
        app.clone(),
        "/api/v1/auth/logout",
        &bearer,
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The refresh token from before logout no longer works.
    let body = serde_json::json!({ "refresh_token": refresh });
    let response = post_json(app, "/api/v1/auth/refresh", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
