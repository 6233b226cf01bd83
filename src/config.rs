//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read once at startup.

use std::env;
use std::time::Duration;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 20;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
/// Fixed UTC offsets must stay strictly within one day.
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Firebase project whose ID tokens are accepted
    pub firebase_project_id: String,
    /// Server port
    pub port: u16,
    /// Upper bound for receipt uploads
    pub max_upload_bytes: usize,
    /// Budget period boundaries are computed in this fixed UTC offset
    pub period_utc_offset_minutes: i32,

    // --- Receipt relay ---
    /// OpenAI-compatible API base URL
    pub llm_base_url: String,
    /// Model used for receipt field extraction
    pub llm_model: String,
    pub ocr_timeout: Duration,
    pub llm_timeout: Duration,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// LLM API key; receipt analysis is skipped when absent
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:8081".to_string(),
            gcp_project_id: "test-project".to_string(),
            firebase_project_id: "test-project".to_string(),
            port: 8080,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            period_utc_offset_minutes: 0,
            llm_base_url: "http://127.0.0.1:9".to_string(),
            llm_model: "test-model".to_string(),
            ocr_timeout: Duration::from_secs(2),
            llm_timeout: Duration::from_secs(2),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            llm_api_key: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| gcp_project_id.clone()),
            gcp_project_id,
            port: parse_or("PORT", 8080)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            period_utc_offset_minutes: parse_utc_offset("PERIOD_UTC_OFFSET_MINUTES")?,
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            ocr_timeout: Duration::from_secs(parse_or(
                "OCR_TIMEOUT_SECS",
                DEFAULT_OCR_TIMEOUT_SECS,
            )?),
            llm_timeout: Duration::from_secs(parse_or(
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            llm_api_key: env::var("LLM_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Parse a UTC offset in minutes, defaulting to 0 (UTC).
fn parse_utc_offset(name: &'static str) -> Result<i32, ConfigError> {
    let minutes: i32 = parse_or(name, 0)?;
    if minutes.abs() >= MAX_UTC_OFFSET_MINUTES {
        return Err(ConfigError::Invalid(name, minutes.to_string()));
    }
    Ok(minutes)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
