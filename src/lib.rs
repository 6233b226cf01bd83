// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Expense Tracker: personal expense ledger with budget-period accounting
//!
//! This crate provides the backend API for recording expenses, tracking
//! daily/weekly/monthly budgets, and relaying PDF receipts through text
//! extraction and LLM field extraction.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{FirebaseTokenVerifier, LedgerService, ReceiptService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub ledger: LedgerService,
    pub receipt_service: ReceiptService,
    pub token_verifier: Arc<FirebaseTokenVerifier>,
}
