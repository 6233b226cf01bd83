//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{ExpenseQueryCursor, FirestoreDb};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const EXPENSES: &str = "expenses";
    pub const BUDGETS: &str = "budgets";
    /// Global reference data shared by all users
    pub const CATEGORIES: &str = "categories";
}
