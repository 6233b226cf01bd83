// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Budget model, period rollover and threshold signaling.
//!
//! A budget's `current_spent` only means something for its own
//! `current_period`. Recording spend in a newer period replaces the
//! accumulator instead of adding to the stale total.

use crate::models::period::{current_period, PeriodKey, PeriodKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Fraction of the limit at which a warning is raised (90%).
pub const WARNING_RATIO: Decimal = Decimal::from_parts(9, 0, 0, false, 1);

/// Largest amount accepted for an expense, a budget limit or a threshold.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Spend could not be added without overflowing the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("amount overflows the spending total")]
pub struct AmountOverflow;

/// Stored budget record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    /// Document ID (derived from owner, category and period kind)
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub category_id: String,
    pub period: PeriodKind,
    /// Spending limit per period
    pub amount: Decimal,
    /// Period key the accumulator belongs to
    #[serde(default)]
    pub current_period: String,
    /// Spend recorded in `current_period`
    #[serde(default)]
    pub current_spent: Decimal,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Whether recording spend continued the stored period or started a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Rollover {
    Accumulated,
    Reset,
}

/// Spending signal raised when an accumulator nears or passes its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum AlertLevel {
    Warning,
    Exceeded,
}

/// Classify `spent` against `limit`: ≥100% exceeded, ≥90% warning.
///
/// Non-positive limits never signal.
pub fn evaluate_threshold(spent: Decimal, limit: Decimal) -> Option<AlertLevel> {
    if limit <= Decimal::ZERO {
        return None;
    }
    if spent >= limit {
        Some(AlertLevel::Exceeded)
    } else if spent >= limit * WARNING_RATIO {
        Some(AlertLevel::Warning)
    } else {
        None
    }
}

impl Budget {
    /// Record `amount` of spend observed in period `period`.
    ///
    /// On overflow the budget is left unchanged.
    pub fn record_spend(
        &mut self,
        amount: Decimal,
        period: &PeriodKey,
        now: &str,
    ) -> Result<Rollover, AmountOverflow> {
        let rollover = if self.current_period == period.as_str() {
            self.current_spent = self
                .current_spent
                .checked_add(amount)
                .ok_or(AmountOverflow)?;
            Rollover::Accumulated
        } else {
            self.current_period = period.as_str().to_string();
            self.current_spent = amount;
            Rollover::Reset
        };

        self.updated_at = now.to_string();
        Ok(rollover)
    }

    /// Spend attributable to the period containing `today`.
    ///
    /// A stale accumulator counts as nothing spent yet.
    pub fn spent_in_period(&self, today: NaiveDate) -> Decimal {
        if current_period(self.period, today) == self.current_period.as_str() {
            self.current_spent
        } else {
            Decimal::ZERO
        }
    }

    pub fn alert(&self) -> Option<AlertLevel> {
        evaluate_threshold(self.current_spent, self.amount)
    }
}

/// Result of applying one expense to one budget.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetUpdate {
    pub budget: Budget,
    pub rollover: Rollover,
    pub alert: Option<AlertLevel>,
}

/// Apply an expense to every active budget on its category.
///
/// Budgets on other categories or marked inactive are left untouched and
/// omitted from the result. Each budget's period is derived from its own kind.
/// Fails without partial results if any accumulator would overflow.
pub fn apply_expense_to_budgets(
    budgets: &[Budget],
    category_id: &str,
    amount: Decimal,
    today: NaiveDate,
    now: &str,
) -> Result<Vec<BudgetUpdate>, AmountOverflow> {
    budgets
        .iter()
        .filter(|b| b.is_active && b.category_id == category_id)
        .map(|b| {
            let mut budget = b.clone();
            let period = current_period(budget.period, today);
            let rollover = budget.record_spend(amount, &period, now)?;
            let alert = budget.alert();
            Ok(BudgetUpdate {
                budget,
                rollover,
                alert,
            })
        })
        .collect()
}

/// Document ID for a user's budget on (category, period kind).
///
/// `:` never survives URL encoding, so distinct triples never share an ID.
pub fn budget_doc_id(user_id: &str, category_id: &str, period: PeriodKind) -> String {
    format!(
        "{}:{}:{}",
        urlencoding::encode(user_id),
        urlencoding::encode(category_id),
        period.as_str()
    )
}
