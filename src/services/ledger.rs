// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ledger service: the server-side boundary for expenses, budgets,
//! categories and profile preferences.
//!
//! Every operation takes the authenticated user explicitly and only
//! touches documents owned by that user.
//!
//! Recording an expense:
//! 1. Validate the request and the category
//! 2. Store the expense
//! 3. Apply it to every active budget on the category, each budget in its
//!    own transaction; one failing budget does not stop the others
//! 4. Evaluate the month-to-date total against the overspending threshold

use crate::db::{ExpenseQueryCursor, FirestoreDb};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::budget::{budget_doc_id, evaluate_threshold, AmountOverflow, MAX_AMOUNT};
use crate::models::category::default_categories;
use crate::models::{
    current_period, AlertLevel, Budget, Category, Expense, ExpenseSoftUpdate, Location,
    PeriodKind, Rollover, User,
};
use crate::time_utils::{format_utc_rfc3339, local_date, month_bounds_rfc3339};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::{stream, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

const MAX_CONCURRENT_DB_OPS: usize = 16;

/// Largest page returned by [`LedgerService::list_expenses`].
pub const MAX_PAGE_SIZE: u32 = 100;

/// Request to record a new expense.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewExpense {
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 200))]
    pub merchant_name: String,
    #[validate(length(max = 100))]
    pub reference_id: Option<String>,
    /// Defaults to the time of recording
    pub transaction_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category_id: String,
    #[validate(nested)]
    pub location: Option<Location>,
}

/// Request to create or update the budget for a (category, period kind).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BudgetRequest {
    #[validate(length(min = 1, max = 100))]
    pub category_id: String,
    pub period: PeriodKind,
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
}

/// Profile fields a user may edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(url)]
    pub photo_url: Option<String>,
    /// Zero clears the threshold.
    #[validate(custom(function = "validate_non_negative_amount"))]
    pub overspending_threshold: Option<Decimal>,
}

fn validate_positive_amount(amount: &Decimal) -> std::result::Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_must_be_positive"));
    }
    validate_amount_bound(amount)
}

fn validate_non_negative_amount(amount: &Decimal) -> std::result::Result<(), ValidationError> {
    if amount.is_sign_negative() {
        return Err(ValidationError::new("amount_must_not_be_negative"));
    }
    validate_amount_bound(amount)
}

fn validate_amount_bound(amount: &Decimal) -> std::result::Result<(), ValidationError> {
    if *amount > MAX_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// Outcome of applying an expense to one budget.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BudgetReport {
    Updated {
        budget_id: String,
        period: PeriodKind,
        current_period: String,
        current_spent: Decimal,
        amount: Decimal,
        rollover: Rollover,
        alert: Option<AlertLevel>,
    },
    /// Budget changed underneath us (deactivated, moved) and was left alone.
    Skipped { budget_id: String },
    Failed { budget_id: String, error: String },
}

/// Month-to-date spending against the user's overspending threshold.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlySpending {
    /// `YYYY-MM`
    pub month: String,
    pub total: Decimal,
    pub expense_count: usize,
    pub threshold: Option<Decimal>,
    pub alert: Option<AlertLevel>,
}

/// Result of recording an expense.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedExpense {
    pub expense: Expense,
    /// `None` if the category's budgets could not be loaded
    pub budgets: Option<Vec<BudgetReport>>,
    /// `None` if the monthly total could not be computed
    pub monthly: Option<MonthlySpending>,
}

/// One page of expenses, newest first.
#[derive(Debug, Clone)]
pub struct ExpensePage {
    pub expenses: Vec<Expense>,
    /// Page size actually applied
    pub limit: u32,
    /// Position after the last expense, when more remain
    pub next: Option<ExpenseQueryCursor>,
}

/// A budget as seen in the current period.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BudgetStatus {
    #[serde(flatten)]
    pub budget: Budget,
    /// Period key for today
    pub period_key: String,
    /// Spend in `period_key` (zero if the stored accumulator is stale)
    pub spent: Decimal,
    pub remaining: Decimal,
    pub alert: Option<AlertLevel>,
}

/// Sum expenses and classify against an optional threshold.
pub fn summarize_month(
    month: String,
    expenses: &[Expense],
    threshold: Option<Decimal>,
) -> std::result::Result<MonthlySpending, AmountOverflow> {
    let total = expenses
        .iter()
        .try_fold(Decimal::ZERO, |total, e| total.checked_add(e.amount))
        .ok_or(AmountOverflow)?;
    let alert = threshold.and_then(|t| evaluate_threshold(total, t));

    Ok(MonthlySpending {
        month,
        total,
        expense_count: expenses.len(),
        threshold,
        alert,
    })
}

/// Describe a budget relative to the period containing `today`.
pub fn budget_status(budget: Budget, today: NaiveDate) -> BudgetStatus {
    let period_key = current_period(budget.period, today).into_string();
    let spent = budget.spent_in_period(today);
    let remaining = (budget.amount - spent).max(Decimal::ZERO);
    let alert = evaluate_threshold(spent, budget.amount);

    BudgetStatus {
        budget,
        period_key,
        spent,
        remaining,
        alert,
    }
}

/// Expense, budget and profile operations scoped to one user.
#[derive(Clone)]
pub struct LedgerService {
    db: FirestoreDb,
    utc_offset_minutes: i32,
}

impl LedgerService {
    pub fn new(db: FirestoreDb, utc_offset_minutes: i32) -> Self {
        Self {
            db,
            utc_offset_minutes,
        }
    }

    fn today(&self) -> NaiveDate {
        local_date(Utc::now(), self.utc_offset_minutes)
    }

    // ─── Categories ──────────────────────────────────────────────

    /// Stored categories, or the built-in set when none are stored.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let stored = self.db.list_categories().await?;
        if stored.is_empty() {
            tracing::debug!("No stored categories, serving defaults");
            return Ok(default_categories());
        }
        Ok(stored)
    }

    async fn ensure_category_exists(&self, category_id: &str) -> Result<()> {
        let known = self
            .categories()
            .await?
            .iter()
            .any(|c| c.id == category_id);

        if !known {
            return Err(AppError::BadRequest(format!(
                "Unknown category: {}",
                category_id
            )));
        }
        Ok(())
    }

    // ─── Expenses ────────────────────────────────────────────────

    /// Record an expense and update the affected budgets.
    ///
    /// The expense write must succeed; budget updates and the monthly check
    /// are best-effort and reported in the result.
    pub async fn record_expense(&self, user: &AuthUser, new: NewExpense) -> Result<RecordedExpense> {
        new.validate()?;
        self.ensure_category_exists(&new.category_id).await?;

        let now = Utc::now();
        let now_str = format_utc_rfc3339(now);
        let expense = Expense {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            amount: new.amount,
            merchant_name: new.merchant_name.trim().to_string(),
            reference_id: new.reference_id.filter(|r| !r.trim().is_empty()),
            transaction_at: format_utc_rfc3339(new.transaction_at.unwrap_or(now)),
            description: new.description,
            category_id: new.category_id,
            location: new.location,
            created_at: now_str.clone(),
            updated_at: now_str,
        };

        self.db.set_expense(&expense).await?;

        tracing::info!(
            user_id = %user.user_id,
            expense_id = %expense.id,
            category_id = %expense.category_id,
            amount = %expense.amount,
            "Expense recorded"
        );

        let budgets = self.apply_to_budgets(user, &expense).await;

        let monthly = match self.monthly_spending(user).await {
            Ok(monthly) => Some(monthly),
            Err(e) => {
                tracing::warn!(user_id = %user.user_id, error = %e, "Monthly spending check failed");
                None
            }
        };

        Ok(RecordedExpense {
            expense,
            budgets,
            monthly,
        })
    }

    /// Apply a stored expense to each active budget on its category.
    ///
    /// `None` means the budgets could not be loaded and none were touched.
    async fn apply_to_budgets(
        &self,
        user: &AuthUser,
        expense: &Expense,
    ) -> Option<Vec<BudgetReport>> {
        let budgets = match self
            .db
            .get_active_budgets(&user.user_id, Some(&expense.category_id))
            .await
        {
            Ok(budgets) => budgets,
            Err(e) => {
                tracing::error!(
                    user_id = %user.user_id,
                    expense_id = %expense.id,
                    error = %e,
                    "Failed to load budgets for expense"
                );
                return None;
            }
        };

        let today = self.today();

        let reports = stream::iter(budgets)
            .map(|budget| async move {
                let result = self
                    .db
                    .record_budget_spend_atomic(
                        &user.user_id,
                        &budget.id,
                        &expense.category_id,
                        expense.amount,
                        today,
                    )
                    .await;

                match result {
                    Ok(Some(update)) => {
                        if let Some(alert) = update.alert {
                            tracing::info!(
                                user_id = %user.user_id,
                                budget_id = %budget.id,
                                alert = ?alert,
                                "Budget threshold reached"
                            );
                        }
                        BudgetReport::Updated {
                            budget_id: update.budget.id,
                            period: update.budget.period,
                            current_period: update.budget.current_period,
                            current_spent: update.budget.current_spent,
                            amount: update.budget.amount,
                            rollover: update.rollover,
                            alert: update.alert,
                        }
                    }
                    Ok(None) => BudgetReport::Skipped {
                        budget_id: budget.id,
                    },
                    Err(e) => {
                        tracing::error!(
                            user_id = %user.user_id,
                            budget_id = %budget.id,
                            error = %e,
                            "Budget update failed"
                        );
                        BudgetReport::Failed {
                            budget_id: budget.id,
                            error: e.to_string(),
                        }
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        Some(reports)
    }

    /// One page of the user's expenses, newest first.
    ///
    /// `limit` is capped at [`MAX_PAGE_SIZE`] and must be positive.
    pub async fn list_expenses(
        &self,
        user: &AuthUser,
        created_after: Option<String>,
        cursor: Option<ExpenseQueryCursor>,
        limit: u32,
    ) -> Result<ExpensePage> {
        if limit == 0 {
            return Err(AppError::BadRequest(
                "Limit must be greater than 0".to_string(),
            ));
        }
        let limit = limit.min(MAX_PAGE_SIZE);

        // One extra item tells whether another page exists
        let mut expenses = self
            .db
            .get_expenses_for_user(&user.user_id, created_after, cursor, limit + 1)
            .await?;

        let next = if expenses.len() > limit as usize {
            expenses.truncate(limit as usize);
            expenses.last().map(|e| ExpenseQueryCursor {
                created_at: e.created_at.clone(),
                expense_id: e.id.clone(),
            })
        } else {
            None
        };

        Ok(ExpensePage {
            expenses,
            limit,
            next,
        })
    }

    /// Get one of the user's expenses.
    pub async fn get_expense(&self, user: &AuthUser, expense_id: &str) -> Result<Expense> {
        self.db
            .get_expense(&user.user_id, expense_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", expense_id)))
    }

    /// Edit the soft fields of one of the user's expenses.
    pub async fn update_expense(
        &self,
        user: &AuthUser,
        expense_id: &str,
        update: ExpenseSoftUpdate,
    ) -> Result<Expense> {
        update.validate()?;
        if update.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }

        let mut expense = self.get_expense(user, expense_id).await?;
        expense.apply_soft_update(update, &format_utc_rfc3339(Utc::now()));
        self.db.set_expense(&expense).await?;

        tracing::info!(user_id = %user.user_id, expense_id, "Expense updated");
        Ok(expense)
    }

    /// Month-to-date spending against the user's overspending threshold.
    pub async fn monthly_spending(&self, user: &AuthUser) -> Result<MonthlySpending> {
        let today = self.today();
        let (start, end) = month_bounds_rfc3339(today, self.utc_offset_minutes);

        let threshold = self
            .db
            .get_user(&user.user_id)
            .await?
            .and_then(|u| u.overspending_threshold);

        let expenses = self
            .db
            .get_expenses_created_between(&user.user_id, &start, &end)
            .await?;

        let month = current_period(PeriodKind::Monthly, today).into_string();
        Ok(summarize_month(month, &expenses, threshold)?)
    }

    // ─── Budgets ─────────────────────────────────────────────────

    /// The user's active budgets as seen today.
    pub async fn list_budgets(&self, user: &AuthUser) -> Result<Vec<BudgetStatus>> {
        let today = self.today();
        let mut budgets = self.db.get_active_budgets(&user.user_id, None).await?;
        budgets.sort_by(|a, b| {
            a.category_id
                .cmp(&b.category_id)
                .then_with(|| a.period.as_str().cmp(b.period.as_str()))
        });

        Ok(budgets
            .into_iter()
            .map(|b| budget_status(b, today))
            .collect())
    }

    /// Create or update the budget for a (category, period kind).
    ///
    /// Updating keeps the running accumulator and reactivates a
    /// soft-deleted budget.
    pub async fn set_budget(&self, user: &AuthUser, request: BudgetRequest) -> Result<BudgetStatus> {
        request.validate()?;
        self.ensure_category_exists(&request.category_id).await?;

        let today = self.today();
        let now = format_utc_rfc3339(Utc::now());
        let id = budget_doc_id(&user.user_id, &request.category_id, request.period);

        let fresh = Budget {
            id: id.clone(),
            user_id: user.user_id.clone(),
            category_id: request.category_id,
            period: request.period,
            amount: request.amount,
            current_period: current_period(request.period, today).into_string(),
            current_spent: Decimal::ZERO,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        // Stored accumulator fields are kept
        let budget = self
            .db
            .edit_budget_atomic(&user.user_id, &id, move |stored| {
                Some(match stored {
                    Some(mut existing) => {
                        existing.amount = fresh.amount;
                        existing.is_active = true;
                        existing.updated_at = fresh.updated_at.clone();
                        existing
                    }
                    None => fresh.clone(),
                })
            })
            .await?
            .ok_or_else(|| AppError::Database(format!("Budget {} is owned by another user", id)))?;

        tracing::info!(
            user_id = %user.user_id,
            budget_id = %budget.id,
            period = %budget.period,
            amount = %budget.amount,
            "Budget saved"
        );

        Ok(budget_status(budget, today))
    }

    /// Soft-delete a budget.
    pub async fn deactivate_budget(&self, user: &AuthUser, budget_id: &str) -> Result<()> {
        let now = format_utc_rfc3339(Utc::now());

        self.db
            .edit_budget_atomic(&user.user_id, budget_id, move |stored| {
                stored.map(|mut budget| {
                    if budget.is_active {
                        budget.is_active = false;
                        budget.updated_at = now.clone();
                    }
                    budget
                })
            })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Budget {} not found", budget_id)))?;

        tracing::info!(user_id = %user.user_id, budget_id, "Budget deactivated");
        Ok(())
    }

    // ─── Profile ─────────────────────────────────────────────────

    pub async fn get_profile(&self, user: &AuthUser) -> Result<User> {
        self.db
            .get_user(&user.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))
    }

    pub async fn update_profile(&self, user: &AuthUser, update: ProfileUpdate) -> Result<User> {
        update.validate()?;

        let mut profile = self.get_profile(user).await?;
        if let Some(name) = update.display_name {
            profile.display_name = Some(name);
        }
        if let Some(url) = update.photo_url {
            profile.photo_url = Some(url);
        }
        if let Some(threshold) = update.overspending_threshold {
            profile.overspending_threshold = (!threshold.is_zero()).then_some(threshold);
        }

        self.db.upsert_user(&profile).await?;
        Ok(profile)
    }
}
