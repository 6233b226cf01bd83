// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: exchange a Firebase ID token for a session, and log out.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::User;
use crate::services::{FirebaseIdentity, TokenError};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    id_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user_id: String,
}

/// Verify a Firebase ID token, record the sign-in, and issue a session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let identity = state
        .token_verifier
        .verify_id_token(&request.id_token)
        .await
        .map_err(|e| match e {
            TokenError::Rejected(reason) => {
                tracing::warn!(reason = %reason, "Rejected Firebase ID token");
                AppError::InvalidToken
            }
            TokenError::Transient(reason) => {
                AppError::Internal(anyhow::anyhow!("ID token verification unavailable: {}", reason))
            }
        })?;

    let existing = state.db.get_user(&identity.uid).await?;
    let is_new_user = existing.is_none();
    let user = merge_sign_in(existing, identity, &format_utc_rfc3339(chrono::Utc::now()));
    state.db.upsert_user(&user).await?;

    let token = create_jwt(&user.user_id, &state.config.jwt_signing_key)?;

    tracing::info!(user_id = %user.user_id, is_new_user, "Session created");

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.frontend_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .build();

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            token,
            user_id: user.user_id,
        }),
    ))
}

/// Clear the session cookie. Bearer-token clients discard their token.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, StatusCode::NO_CONTENT)
}

/// Fold a verified sign-in into the stored profile.
///
/// Identity fields are refreshed when the token carries them; preferences
/// such as the overspending threshold are kept.
fn merge_sign_in(existing: Option<User>, identity: FirebaseIdentity, now: &str) -> User {
    match existing {
        Some(mut user) => {
            if identity.email.is_some() {
                user.email = identity.email;
            }
            if identity.display_name.is_some() {
                user.display_name = identity.display_name;
            }
            if identity.photo_url.is_some() {
                user.photo_url = identity.photo_url;
            }
            user.last_active = now.to_string();
            user
        }
        None => User {
            user_id: identity.uid,
            email: identity.email,
            display_name: identity.display_name,
            photo_url: identity.photo_url,
            overspending_threshold: None,
            created_at: now.to_string(),
            last_active: now.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn identity(name: Option<&str>) -> FirebaseIdentity {
        FirebaseIdentity {
            uid: "uid-1".to_string(),
            email: Some("a@example.com".to_string()),
            display_name: name.map(str::to_string),
            photo_url: None,
        }
    }

    #[test]
    fn test_first_sign_in_creates_profile() {
        let user = merge_sign_in(None, identity(Some("Ana")), "2024-06-01T00:00:00Z");
        assert_eq!(user.user_id, "uid-1");
        assert_eq!(user.display_name.as_deref(), Some("Ana"));
        assert_eq!(user.created_at, user.last_active);
        assert_eq!(user.overspending_threshold, None);
    }

    #[test]
    fn test_repeat_sign_in_keeps_preferences() {
        let first = merge_sign_in(None, identity(Some("Ana")), "2024-06-01T00:00:00Z");
        let mut stored = first.clone();
        stored.overspending_threshold = Some(dec!(1500));

        let user = merge_sign_in(Some(stored), identity(None), "2024-06-02T00:00:00Z");
        assert_eq!(user.display_name.as_deref(), Some("Ana"));
        assert_eq!(user.overspending_threshold, Some(dec!(1500)));
        assert_eq!(user.created_at, "2024-06-01T00:00:00Z");
        assert_eq!(user.last_active, "2024-06-02T00:00:00Z");
    }
}
