//! User model for storage and API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Firebase UID (also used as document ID)
    pub user_id: String,
    /// Email address (may be None for anonymous/phone sign-in)
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Profile picture URL
    pub photo_url: Option<String>,
    /// Monthly spending at which overspend alerts fire
    #[serde(default)]
    pub overspending_threshold: Option<Decimal>,
    /// When user first signed in
    pub created_at: String,
    /// Last sign-in timestamp
    pub last_active: String,
}
