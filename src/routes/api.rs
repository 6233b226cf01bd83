// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile, categories, spending.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Category;
use crate::services::ledger::{MonthlySpending, ProfileUpdate};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/categories", get(get_categories))
        .route("/api/spending/monthly", get(get_monthly_spending))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub overspending_threshold: Option<Decimal>,
}

impl From<crate::models::User> for UserResponse {
    fn from(user: crate::models::User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            overspending_threshold: user.overspending_threshold,
        }
    }
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state.ledger.get_profile(&user).await?;
    Ok(Json(profile.into()))
}

/// Update display fields and the overspending threshold.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>> {
    tracing::debug!(user_id = %user.user_id, "Updating profile");
    let profile = state.ledger.update_profile(&user, update).await?;
    Ok(Json(profile.into()))
}

// ─── Categories ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
}

async fn get_categories(State(state): State<Arc<AppState>>) -> Result<Json<CategoriesResponse>> {
    let categories = state.ledger.categories().await?;
    Ok(Json(CategoriesResponse { categories }))
}

// ─── Monthly Spending ────────────────────────────────────────

/// Month-to-date total and overspending alert for the current user.
async fn get_monthly_spending(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MonthlySpending>> {
    let spending = state.ledger.monthly_spending(&user).await?;
    Ok(Json(spending))
}
