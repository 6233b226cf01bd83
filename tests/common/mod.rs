// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use expense_tracker::config::Config;
use expense_tracker::db::FirestoreDb;
use expense_tracker::routes::create_router;
use expense_tracker::services::{FirebaseTokenVerifier, LedgerService, LlmClient, ReceiptService};
use expense_tracker::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Key id the static test verifier accepts.
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

#[allow(dead_code)]
const TEST_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/firebase_test_key.pem");
#[allow(dead_code)]
const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/firebase_test_key.pub.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

#[allow(dead_code)]
fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Build app state around the given database.
#[allow(dead_code)]
pub fn test_state(db: FirestoreDb) -> Arc<AppState> {
    let config = Config::test_default();

    let llm = LlmClient::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
        config.llm_timeout,
    );
    let receipt_service = ReceiptService::new(llm, config.ocr_timeout, config.max_upload_bytes);
    let ledger = LedgerService::new(db.clone(), config.period_utc_offset_minutes);

    let decoding_key =
        DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).expect("test public key should parse");
    let token_verifier = Arc::new(
        FirebaseTokenVerifier::new_with_static_key(&config, TEST_KID, decoding_key)
            .expect("static verifier should build"),
    );

    Arc::new(AppState {
        config,
        db,
        ledger,
        receipt_service,
        token_verifier,
    })
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(test_db_offline());
    (create_router(state.clone()), state)
}

/// Create a session JWT for `user_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }

    let now = now_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 86400,
        iat: now,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// Create a Firebase-style ID token signed with the fixture key.
#[allow(dead_code)]
pub fn create_test_id_token(uid: &str, project_id: &str, kid: &str) -> String {
    #[derive(Serialize)]
    struct Claims {
        iss: String,
        aud: String,
        sub: String,
        iat: usize,
        exp: usize,
        email: String,
        name: String,
    }

    let now = now_secs();
    let claims = Claims {
        iss: format!("https://securetoken.google.com/{}", project_id),
        aud: project_id.to_string(),
        sub: uid.to_string(),
        iat: now,
        exp: now + 3600,
        email: format!("{}@example.com", uid),
        name: "Test User".to_string(),
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());

    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).expect("test private key should parse"),
    )
    .unwrap()
}
