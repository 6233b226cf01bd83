// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Expense model for storage and API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Where an expense happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Reverse-geocoded address, if the client resolved one
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

/// Stored expense record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    /// Document ID
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub amount: Decimal,
    pub merchant_name: String,
    /// Receipt reference number, if known
    pub reference_id: Option<String>,
    /// When the transaction happened (ISO 8601)
    pub transaction_at: String,
    #[serde(default)]
    pub description: String,
    pub category_id: String,
    pub location: Option<Location>,
    /// When the expense was recorded (ISO 8601, UTC)
    pub created_at: String,
    pub updated_at: String,
}

/// Fields a user may change after an expense is recorded.
///
/// Amount, category and dates feed budget accounting and stay fixed.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ExpenseSoftUpdate {
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub merchant_name: Option<String>,
    #[validate(nested)]
    pub location: Option<Location>,
}

impl ExpenseSoftUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.merchant_name.is_none() && self.location.is_none()
    }
}

impl Expense {
    /// Apply a soft-field update.
    pub fn apply_soft_update(&mut self, update: ExpenseSoftUpdate, now: &str) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(merchant_name) = update.merchant_name {
            self.merchant_name = merchant_name;
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
        self.updated_at = now.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_expense() -> Expense {
        Expense {
            id: "e1".to_string(),
            user_id: "user-1".to_string(),
            amount: dec!(12.50),
            merchant_name: "Corner Cafe".to_string(),
            reference_id: None,
            transaction_at: "2024-06-01T09:00:00Z".to_string(),
            description: String::new(),
            category_id: "food".to_string(),
            location: None,
            created_at: "2024-06-01T09:01:00Z".to_string(),
            updated_at: "2024-06-01T09:01:00Z".to_string(),
        }
    }

    #[test]
    fn test_soft_update_leaves_accounting_fields() {
        let mut expense = make_expense();
        expense.apply_soft_update(
            ExpenseSoftUpdate {
                description: Some("team breakfast".to_string()),
                ..Default::default()
            },
            "2024-06-02T00:00:00Z",
        );

        assert_eq!(expense.description, "team breakfast");
        assert_eq!(expense.merchant_name, "Corner Cafe");
        assert_eq!(expense.amount, dec!(12.50));
        assert_eq!(expense.category_id, "food");
        assert_eq!(expense.updated_at, "2024-06-02T00:00:00Z");
    }

    #[test]
    fn test_location_bounds_validated() {
        let bad = Location {
            latitude: 91.0,
            longitude: 0.0,
            address: None,
        };
        assert!(bad.validate().is_err());

        let update = ExpenseSoftUpdate {
            location: Some(bad),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_empty_soft_update() {
        assert!(ExpenseSoftUpdate::default().is_empty());
    }
}
