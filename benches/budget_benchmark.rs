use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use expense_tracker::models::budget::apply_expense_to_budgets;
use expense_tracker::models::{current_period, Budget, PeriodKind};
use rust_decimal::Decimal;
use std::hint::black_box;

fn budget(i: usize, period: PeriodKind, current_period: &str) -> Budget {
    Budget {
        id: format!("budget-{}", i),
        user_id: "bench-user".to_string(),
        category_id: if i % 4 == 0 { "food" } else { "transport" }.to_string(),
        period,
        amount: Decimal::from(100),
        current_period: current_period.to_string(),
        current_spent: Decimal::new(8550, 2),
        is_active: i % 7 != 0,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

fn benchmark_apply_expense(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap_or_default();
    let kinds = [PeriodKind::Daily, PeriodKind::Weekly, PeriodKind::Monthly];

    // Budgets already in the current period
    let current: Vec<Budget> = (0..300)
        .map(|i| {
            let kind = kinds[i % kinds.len()];
            budget(i, kind, current_period(kind, today).as_str())
        })
        .collect();

    // Budgets last touched in a previous period
    let stale: Vec<Budget> = (0..300)
        .map(|i| budget(i, kinds[i % kinds.len()], "2024-01"))
        .collect();

    let amount = Decimal::new(1999, 2);
    let now = "2024-06-15T12:00:00Z";

    let mut group = c.benchmark_group("apply_expense_to_budgets");

    group.bench_function("same_period", |b| {
        b.iter(|| apply_expense_to_budgets(black_box(&current), "food", amount, today, now))
    });

    group.bench_function("rollover", |b| {
        b.iter(|| apply_expense_to_budgets(black_box(&stale), "food", amount, today, now))
    });

    group.finish();
}

fn benchmark_current_period(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let days: Vec<NaiveDate> = start.iter_days().take(366).collect();

    c.bench_function("current_period_weekly_year", |b| {
        b.iter(|| {
            for day in &days {
                black_box(current_period(PeriodKind::Weekly, *day));
            }
        })
    });
}

criterion_group!(benches, benchmark_apply_expense, benchmark_current_period);
criterion_main!(benches);
