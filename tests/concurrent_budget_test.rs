// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Concurrent expenses and budget edits must not lose increments.

use expense_tracker::middleware::AuthUser;
use expense_tracker::models::PeriodKind;
use expense_tracker::services::ledger::{BudgetRequest, NewExpense};
use expense_tracker::services::LedgerService;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod common;
use common::test_db;

const NUM_CONCURRENT_EXPENSES: u32 = 10;

fn food_expense(i: u32) -> NewExpense {
    NewExpense {
        amount: dec!(10),
        merchant_name: format!("Shop {}", i),
        reference_id: None,
        transaction_at: None,
        description: String::new(),
        category_id: "food".to_string(),
        location: None,
    }
}

fn food_budget(amount: Decimal) -> BudgetRequest {
    BudgetRequest {
        category_id: "food".to_string(),
        period: PeriodKind::Monthly,
        amount,
    }
}

#[tokio::test]
async fn test_concurrent_expenses_accumulate_exactly() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone(), 0);
    let user = AuthUser {
        user_id: format!("race-{}", uuid::Uuid::new_v4()),
    };

    let status = ledger
        .set_budget(&user, food_budget(dec!(1000)))
        .await
        .expect("Failed to create budget");

    let mut handles = vec![];
    for i in 0..NUM_CONCURRENT_EXPENSES {
        let ledger = ledger.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            ledger.record_expense(&user, food_expense(i)).await
        }));
    }

    for handle in handles {
        handle
            .await
            .expect("Task join failed")
            .expect("Expense recording failed");
    }

    let budget = db
        .get_budget(&user.user_id, &status.budget.id)
        .await
        .expect("Failed to fetch budget")
        .expect("Budget document not found");

    assert_eq!(
        budget.current_spent,
        dec!(10) * Decimal::from(NUM_CONCURRENT_EXPENSES),
        "Budget accumulator lost increments under concurrency"
    );
}

#[tokio::test]
async fn test_budget_edits_keep_concurrent_spend() {
    require_emulator!();

    let db = test_db().await;
    let ledger = LedgerService::new(db.clone(), 0);
    let user = AuthUser {
        user_id: format!("race-{}", uuid::Uuid::new_v4()),
    };

    let status = ledger
        .set_budget(&user, food_budget(dec!(1000)))
        .await
        .expect("Failed to create budget");

    let mut expenses = vec![];
    let mut edits = vec![];
    for i in 0..NUM_CONCURRENT_EXPENSES {
        let ledger_for_expense = ledger.clone();
        let user_for_expense = user.clone();
        expenses.push(tokio::spawn(async move {
            ledger_for_expense
                .record_expense(&user_for_expense, food_expense(i))
                .await
        }));

        let ledger = ledger.clone();
        let user = user.clone();
        edits.push(tokio::spawn(async move {
            ledger
                .set_budget(&user, food_budget(dec!(1000) + Decimal::from(i)))
                .await
        }));
    }

    for handle in expenses {
        handle
            .await
            .expect("Task join failed")
            .expect("Expense recording failed");
    }
    for handle in edits {
        handle
            .await
            .expect("Task join failed")
            .expect("Budget edit failed");
    }

    let budget = db
        .get_budget(&user.user_id, &status.budget.id)
        .await
        .expect("Failed to fetch budget")
        .expect("Budget document not found");

    assert_eq!(
        budget.current_spent,
        dec!(10) * Decimal::from(NUM_CONCURRENT_EXPENSES),
        "Budget edit overwrote a concurrent increment"
    );
    assert!(budget.is_active);
    assert!(budget.amount >= dec!(1000));
    assert!(budget.amount < dec!(1000) + Decimal::from(NUM_CONCURRENT_EXPENSES));
}
