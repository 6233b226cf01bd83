// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile and notification preferences)
//! - Expenses (per-user, created once, soft fields editable)
//! - Budgets (per-user, period accumulators updated transactionally)
//! - Categories (global reference data)
//!
//! Every per-user read filters on `user_id` so callers cannot reach
//! another user's documents.

use crate::db::collections;
use crate::error::AppError;
use crate::models::budget::apply_expense_to_budgets;
use crate::models::{Budget, BudgetUpdate, Category, Expense, User};
use crate::time_utils::format_utc_rfc3339;
use chrono::NaiveDate;
use firestore::errors::{BackoffError, FirestoreError};
use firestore::{FirestoreQueryCursor, FirestoreQueryDirection};
use rust_decimal::Decimal;

/// Position after the last expense of a page (newest-first ordering).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseQueryCursor {
    pub created_at: String,
    pub expense_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by Firebase UID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Category Operations ─────────────────────────────────────

    /// All stored categories, ordered by name.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CATEGORIES)
            .order_by([("name", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Expense Operations ──────────────────────────────────────

    /// Store an expense (create or overwrite by id).
    pub async fn set_expense(&self, expense: &Expense) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::EXPENSES)
            .document_id(&expense.id)
            .object(expense)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get an expense owned by `user_id`.
    ///
    /// Expenses belonging to another user are reported as absent.
    pub async fn get_expense(
        &self,
        user_id: &str,
        expense_id: &str,
    ) -> Result<Option<Expense>, AppError> {
        let expense: Option<Expense> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::EXPENSES)
            .obj()
            .one(expense_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(expense.filter(|e| e.user_id == user_id))
    }

    /// Get a user's expenses, newest first, with cursor pagination.
    pub async fn get_expenses_for_user(
        &self,
        user_id: &str,
        created_after: Option<String>,
        cursor: Option<ExpenseQueryCursor>,
        limit: u32,
    ) -> Result<Vec<Expense>, AppError> {
        let owner = user_id.to_string();
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::EXPENSES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(owner.clone()),
                    created_after
                        .clone()
                        .and_then(|after| q.field("created_at").greater_than(after)),
                ])
            })
            .order_by([
                ("created_at", FirestoreQueryDirection::Descending),
                ("id", FirestoreQueryDirection::Descending),
            ]);

        let query = match cursor {
            Some(cursor) => query.start_at(FirestoreQueryCursor::AfterValue(vec![
                cursor.created_at.into(),
                cursor.expense_id.into(),
            ])),
            None => query,
        };

        query
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user's expenses created in `[start, end)` (RFC3339 UTC bounds).
    pub async fn get_expenses_created_between(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Expense>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::EXPENSES)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("created_at").greater_than_or_equal(start),
                    q.field("created_at").less_than(end),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Budget Operations ───────────────────────────────────────

    /// Get a budget owned by `user_id`.
    pub async fn get_budget(
        &self,
        user_id: &str,
        budget_id: &str,
    ) -> Result<Option<Budget>, AppError> {
        let budget: Option<Budget> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BUDGETS)
            .obj()
            .one(budget_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(budget.filter(|b| b.user_id == user_id))
    }

    /// Create or update a budget outside any transaction.
    ///
    /// Overwrites the accumulator; ledger edits go through
    /// [`Self::edit_budget_atomic`].
    pub async fn set_budget(&self, budget: &Budget) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BUDGETS)
            .document_id(&budget.id)
            .object(budget)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a user's active budgets, optionally restricted to one category.
    pub async fn get_active_budgets(
        &self,
        user_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<Budget>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::BUDGETS)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("is_active").eq(true),
                    category_id.and_then(|c| q.field("category_id").eq(c)),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Budget Accounting ────────────────────────────────

    /// Atomically record an expense against one budget.
    ///
    /// The budget is read and written inside a Firestore transaction. If a
    /// concurrent expense modifies the same budget, Firestore retries the
    /// transaction with fresh data, so no increment is lost and a period
    /// rollover is applied exactly once.
    ///
    /// Returns `None` if the budget no longer exists, is inactive, belongs
    /// to a different user, or tracks a different category. Fails without
    /// writing if the accumulator would overflow.
    pub async fn record_budget_spend_atomic(
        &self,
        user_id: &str,
        budget_id: &str,
        category_id: &str,
        amount: Decimal,
        today: NaiveDate,
    ) -> Result<Option<BudgetUpdate>, AppError> {
        let client = self.get_client()?;

        let update = client
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let budget_id = budget_id.to_string();
                let category_id = category_id.to_string();

                Box::pin(async move {
                    // Reads through `db` are bound to the transaction
                    let stored: Option<Budget> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::BUDGETS)
                        .obj()
                        .one(&budget_id)
                        .await?;

                    let Some(stored) = stored.filter(|b| b.user_id == user_id) else {
                        return Ok(Ok(None));
                    };

                    let now = format_utc_rfc3339(chrono::Utc::now());
                    let update = match apply_expense_to_budgets(
                        std::slice::from_ref(&stored),
                        &category_id,
                        amount,
                        today,
                        &now,
                    ) {
                        Ok(updates) => updates.into_iter().next(),
                        // Nothing is written; the transaction commits empty
                        Err(overflow) => return Ok(Err(overflow)),
                    };

                    if let Some(update) = &update {
                        db.fluent()
                            .update()
                            .in_col(collections::BUDGETS)
                            .document_id(&budget_id)
                            .object(&update.budget)
                            .add_to_transaction(transaction)?;
                    }

                    Ok::<_, BackoffError<FirestoreError>>(Ok(update))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Budget transaction failed: {}", e)))??;

        if let Some(update) = &update {
            tracing::info!(
                user_id,
                budget_id,
                period = %update.budget.current_period,
                spent = %update.budget.current_spent,
                rollover = ?update.rollover,
                "Budget spend recorded atomically"
            );
        }

        Ok(update)
    }

    /// Read, edit and write back one budget inside a transaction.
    ///
    /// `edit` receives the stored budget (`None` if absent) and returns the
    /// budget to write, or `None` to leave the store untouched. It may run
    /// more than once when Firestore retries on contention. A document owned
    /// by another user is never passed to `edit` and yields `None`.
    pub async fn edit_budget_atomic<F>(
        &self,
        user_id: &str,
        budget_id: &str,
        edit: F,
    ) -> Result<Option<Budget>, AppError>
    where
        F: Fn(Option<Budget>) -> Option<Budget> + Clone + Send + Sync + 'static,
    {
        let client = self.get_client()?;

        client
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let budget_id = budget_id.to_string();
                let edit = edit.clone();

                Box::pin(async move {
                    let stored: Option<Budget> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::BUDGETS)
                        .obj()
                        .one(&budget_id)
                        .await?;

                    if stored.as_ref().is_some_and(|b| b.user_id != user_id) {
                        return Ok(None);
                    }

                    let Some(edited) = edit(stored) else {
                        return Ok(None);
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::BUDGETS)
                        .document_id(&budget_id)
                        .object(&edited)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>(Some(edited))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Budget transaction failed: {}", e)))
    }
}
