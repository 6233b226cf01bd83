// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod budget;
pub mod category;
pub mod expense;
pub mod period;
pub mod user;

pub use budget::{AlertLevel, Budget, BudgetUpdate, Rollover};
pub use category::Category;
pub use expense::{Expense, ExpenseSoftUpdate, Location};
pub use period::{current_period, PeriodKey, PeriodKind};
pub use user::User;
