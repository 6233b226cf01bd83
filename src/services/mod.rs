// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod firebase_auth;
pub mod ledger;
pub mod llm;
pub mod receipt;

pub use firebase_auth::{FirebaseIdentity, FirebaseTokenVerifier, TokenError};
pub use ledger::{LedgerService, RecordedExpense};
pub use llm::{LlmClient, LlmError};
pub use receipt::{ReceiptAnalysis, ReceiptService};
