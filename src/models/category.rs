// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Expense categories (global reference data).

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Icon name understood by the mobile client
    pub icon: String,
    pub color: Option<String>,
}

/// Categories served when the `categories` collection is empty.
pub fn default_categories() -> Vec<Category> {
    [
        ("food", "Food & Dining", "restaurant", "#FF6B6B"),
        ("groceries", "Groceries", "cart", "#4ECDC4"),
        ("transport", "Transportation", "car", "#45B7D1"),
        ("shopping", "Shopping", "bag", "#F7B731"),
        ("entertainment", "Entertainment", "film", "#A55EEA"),
        ("bills", "Bills & Utilities", "receipt", "#26DE81"),
        ("health", "Healthcare", "medkit", "#FC5C65"),
        ("education", "Education", "school", "#2D98DA"),
        ("travel", "Travel", "airplane", "#FD9644"),
        ("other", "Other", "ellipsis-horizontal", "#778CA3"),
    ]
    .into_iter()
    .map(|(id, name, icon, color)| Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        color: Some(color.to_string()),
    })
    .collect()
}
