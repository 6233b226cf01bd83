// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Expense routes: record, list, fetch and edit soft fields.

use crate::db::ExpenseQueryCursor;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Expense, ExpenseSoftUpdate};
use crate::services::ledger::NewExpense;
use crate::services::RecordedExpense;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route(
            "/api/expenses/{id}",
            get(get_expense).patch(update_expense),
        )
}

/// Record an expense and apply it to the matching budgets.
async fn create_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<NewExpense>,
) -> Result<(StatusCode, Json<RecordedExpense>)> {
    let recorded = state.ledger.record_expense(&user, request).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

async fn get_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Expense>> {
    Ok(Json(state.ledger.get_expense(&user, &id).await?))
}

/// Edit description, merchant name or location.
async fn update_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(update): Json<ExpenseSoftUpdate>,
) -> Result<Json<Expense>> {
    Ok(Json(state.ledger.update_expense(&user, &id, update).await?))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ExpensesQuery {
    /// Only expenses created after this instant (RFC3339)
    after: Option<String>,
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    50
}

const CURSOR_SEPARATOR: char = '|';

fn parse_after_timestamp(after: Option<&str>) -> Result<Option<String>> {
    after
        .map(|raw| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .map(|dt| format_utc_rfc3339(dt.with_timezone(&chrono::Utc)))
                .map_err(|_| {
                    AppError::BadRequest(
                        "Invalid 'after' parameter: must be RFC3339 datetime".to_string(),
                    )
                })
        })
        .transpose()
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<ExpenseQueryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let (created_at, expense_id) = decoded_str
                .split_once(CURSOR_SEPARATOR)
                .ok_or_else(invalid_cursor)?;

            if expense_id.is_empty()
                || chrono::DateTime::parse_from_rfc3339(created_at).is_err()
            {
                return Err(invalid_cursor());
            }

            Ok(ExpenseQueryCursor {
                created_at: created_at.to_string(),
                expense_id: expense_id.to_string(),
            })
        })
        .transpose()
}

fn encode_cursor(cursor: &ExpenseQueryCursor) -> String {
    let payload = format!(
        "{}{}{}",
        cursor.created_at, CURSOR_SEPARATOR, cursor.expense_id
    );
    URL_SAFE_NO_PAD.encode(payload)
}

#[derive(Serialize)]
pub struct ExpensesResponse {
    pub expenses: Vec<Expense>,
    pub limit: u32,
    pub next_cursor: Option<String>,
}

/// List the user's expenses, newest first.
async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ExpensesQuery>,
) -> Result<Json<ExpensesResponse>> {
    tracing::debug!(
        user_id = %user.user_id,
        after = ?params.after,
        cursor = ?params.cursor,
        limit = params.limit,
        "Fetching expenses"
    );

    let after = parse_after_timestamp(params.after.as_deref())?;
    let cursor = parse_cursor(params.cursor.as_deref())?;

    let page = state
        .ledger
        .list_expenses(&user, after, cursor, params.limit)
        .await?;
    let next_cursor = page.next.as_ref().map(encode_cursor);

    Ok(Json(ExpensesResponse {
        expenses: page.expenses,
        limit: page.limit,
        next_cursor,
    }))
}
