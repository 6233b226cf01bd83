// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session exchange tests: Firebase ID token in, session token out.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;
use common::{create_test_app, create_test_id_token, TEST_KID};

async fn post_session(id_token: &str) -> axum::response::Response {
    let (app, _) = create_test_app();

    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/auth/session")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "idToken": id_token }).to_string(),
            ))
            .unwrap(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_garbage_id_token_rejected() {
    let response = post_session("not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_id_token_for_other_project_rejected() {
    let token = create_test_id_token("uid-1", "someone-elses-project", TEST_KID);
    let response = post_session(&token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_id_token_with_unknown_kid_rejected() {
    let token = create_test_id_token("uid-1", "test-project", "rotated-away");
    let response = post_session(&token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_id_token_passes_verification() {
    let token = create_test_id_token("uid-1", "test-project", TEST_KID);
    let response = post_session(&token).await;

    // Verification passes; recording the sign-in needs the database,
    // which is offline in this app.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, "expense_token=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(set_cookie.starts_with("expense_token="));
}
