// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Budget routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::ledger::{BudgetRequest, BudgetStatus};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/budgets", get(list_budgets).put(set_budget))
        .route("/api/budgets/{id}", delete(delete_budget))
}

#[derive(Serialize)]
pub struct BudgetsResponse {
    pub budgets: Vec<BudgetStatus>,
}

/// Active budgets with spend in the current period.
async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BudgetsResponse>> {
    let budgets = state.ledger.list_budgets(&user).await?;
    Ok(Json(BudgetsResponse { budgets }))
}

/// Create or update the budget for a (category, period) pair.
async fn set_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<BudgetRequest>,
) -> Result<Json<BudgetStatus>> {
    Ok(Json(state.ledger.set_budget(&user, request).await?))
}

/// Soft-delete: the budget stops receiving expenses but keeps its history.
async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.ledger.deactivate_budget(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
