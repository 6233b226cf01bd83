// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt relay: PDF text extraction followed by LLM field extraction.
//!
//! Handles:
//! - Upload validation (declared type, sniffed type, size)
//! - Text extraction on a blocking thread with a deadline
//! - Field extraction through the LLM with a fixed prompt
//!
//! Remote failures never fail the request: they yield an all-null analysis.

use crate::error::AppError;
use crate::services::llm::LlmClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const PDF_MIME: &str = "application/pdf";

/// Extracted text beyond this many characters is not sent to the LLM.
const MAX_PROMPT_CHARS: usize = 12_000;

const RECEIPT_SYSTEM_PROMPT: &str = "You extract payment details from receipt text. \
Reply with a single JSON object and nothing else, using exactly these keys: \
\"referenceId\" (transaction or reference number), \"date\" (transaction date), \
\"time\" (transaction time), \"beneficiaryName\" (merchant or recipient name), \
\"amount\" (total amount paid, digits and decimal point only). \
Use null for any value that is not present in the text.";

/// Structured fields extracted from a receipt. Unknown fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReceiptAnalysis {
    pub reference_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub beneficiary_name: Option<String>,
    pub amount: Option<String>,
}

impl ReceiptAnalysis {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of running a receipt through the relay.
#[derive(Debug, Clone)]
pub struct ReceiptExtraction {
    pub text: String,
    pub analysis: ReceiptAnalysis,
}

/// Receipt relay service.
#[derive(Clone)]
pub struct ReceiptService {
    llm: LlmClient,
    ocr_timeout: Duration,
    max_upload_bytes: usize,
}

impl ReceiptService {
    pub fn new(llm: LlmClient, ocr_timeout: Duration, max_upload_bytes: usize) -> Self {
        Self {
            llm,
            ocr_timeout,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Reject anything that is not a size-bounded PDF.
    pub fn validate_upload(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<(), AppError> {
        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        if data.len() > self.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds the {} byte limit",
                self.max_upload_bytes
            )));
        }

        let declared_pdf = filename.to_ascii_lowercase().ends_with(".pdf")
            || content_type.is_some_and(|ct| ct.eq_ignore_ascii_case(PDF_MIME));
        let sniffed_pdf = infer::get(data).is_some_and(|t| t.mime_type() == PDF_MIME);

        if !declared_pdf || !sniffed_pdf {
            return Err(AppError::UnsupportedMediaType(
                "Only PDF files are allowed".to_string(),
            ));
        }

        Ok(())
    }

    /// Extract text and analyze it. Never fails; failures yield empty results.
    pub async fn process(&self, data: Vec<u8>) -> ReceiptExtraction {
        let text = self.extract_text(data).await.unwrap_or_default();
        let analysis = if text.trim().is_empty() {
            ReceiptAnalysis::default()
        } else {
            self.analyze_text(&text).await
        };

        ReceiptExtraction { text, analysis }
    }

    /// Extract PDF text within the configured deadline.
    pub async fn extract_text(&self, data: Vec<u8>) -> Option<String> {
        extract_with_timeout(self.ocr_timeout, move || {
            pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
        })
        .await
    }

    /// Ask the LLM for the receipt fields.
    pub async fn analyze_text(&self, text: &str) -> ReceiptAnalysis {
        if !self.llm.is_configured() {
            tracing::warn!("LLM API key not configured, skipping receipt analysis");
            return ReceiptAnalysis::default();
        }

        let prompt: String = text.chars().take(MAX_PROMPT_CHARS).collect();

        match self.llm.complete(RECEIPT_SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => parse_analysis(&reply).unwrap_or_else(|| {
                tracing::warn!(reply_chars = reply.len(), "LLM reply was not a JSON object");
                ReceiptAnalysis::default()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Receipt analysis failed");
                ReceiptAnalysis::default()
            }
        }
    }
}

/// Run a blocking extractor on the blocking pool, bounded by `timeout`.
///
/// Errors, panics and timeouts all yield `None`. A timed-out extractor
/// keeps running in the background until it returns.
pub async fn extract_with_timeout<F>(timeout: Duration, extractor: F) -> Option<String>
where
    F: FnOnce() -> Result<String, String> + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(extractor)).await {
        Ok(Ok(Ok(text))) => Some(text),
        Ok(Ok(Err(e))) => {
            tracing::warn!(error = %e, "PDF text extraction failed");
            None
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "PDF text extraction panicked");
            None
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "PDF text extraction timed out");
            None
        }
    }
}

/// Parse the first JSON object in an LLM reply.
///
/// Tolerates code fences and surrounding prose. Numbers are converted to
/// strings; empty strings and `"null"` become `None`.
pub fn parse_analysis(reply: &str) -> Option<ReceiptAnalysis> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&reply[start..=end]).ok()?;
    let object = value.as_object()?;

    let field = |key: &str| -> Option<String> {
        match object.get(key)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    Some(ReceiptAnalysis {
        reference_id: field("referenceId"),
        date: field("date"),
        time: field("time"),
        beneficiary_name: field("beneficiaryName"),
        amount: field("amount"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ReceiptService {
        let llm = LlmClient::new("http://127.0.0.1:9", None, "m", Duration::from_secs(1));
        ReceiptService::new(llm, Duration::from_secs(1), 1024)
    }

    #[test]
    fn test_parse_analysis_plain_json() {
        let reply = r#"{"referenceId":"TX-991","date":"2024-06-01","time":"14:05","beneficiaryName":"Corner Cafe","amount":"12.50"}"#;
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.reference_id.as_deref(), Some("TX-991"));
        assert_eq!(analysis.beneficiary_name.as_deref(), Some("Corner Cafe"));
        assert_eq!(analysis.amount.as_deref(), Some("12.50"));
    }

    #[test]
    fn test_parse_analysis_fenced_with_numbers_and_nulls() {
        let reply = "Here you go:\n```json\n{\"referenceId\": null, \"date\": \"\", \"time\": \"null\", \"beneficiaryName\": \"ACME\", \"amount\": 42.1}\n```";
        let analysis = parse_analysis(reply).unwrap();
        assert_eq!(analysis.reference_id, None);
        assert_eq!(analysis.date, None);
        assert_eq!(analysis.time, None);
        assert_eq!(analysis.beneficiary_name.as_deref(), Some("ACME"));
        assert_eq!(analysis.amount.as_deref(), Some("42.1"));
    }

    #[test]
    fn test_parse_analysis_rejects_prose() {
        assert!(parse_analysis("I could not read this receipt.").is_none());
        assert!(parse_analysis("} nope {").is_none());
    }

    #[test]
    fn test_analysis_serializes_nulls_camel_case() {
        let json = serde_json::to_value(ReceiptAnalysis::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "referenceId": null,
                "date": null,
                "time": null,
                "beneficiaryName": null,
                "amount": null
            })
        );
    }

    #[test]
    fn test_validate_upload_rejects_non_pdf() {
        let svc = service();
        let err = svc
            .validate_upload("notes.txt", Some("text/plain"), b"hello")
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));

        // Renamed file without PDF content
        let err = svc
            .validate_upload("fake.pdf", Some(PDF_MIME), b"GIF89a....")
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_validate_upload_size_and_empty() {
        let svc = service();
        let mut big = b"%PDF-1.4\n".to_vec();
        big.resize(2048, b' ');
        assert!(matches!(
            svc.validate_upload("r.pdf", None, &big),
            Err(AppError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            svc.validate_upload("r.pdf", None, b""),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_validate_upload_accepts_pdf() {
        let svc = service();
        assert!(svc
            .validate_upload("Receipt.PDF", None, b"%PDF-1.7\n%...")
            .is_ok());
    }

    #[tokio::test]
    async fn test_extraction_timeout_yields_none() {
        let text = extract_with_timeout(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok("late".to_string())
        })
        .await;
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_extraction_panic_yields_none() {
        let text = extract_with_timeout(Duration::from_secs(1), || panic!("bad xref")).await;
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_garbage_pdf_degrades_to_null_analysis() {
        let result = service().process(b"%PDF-1.4\nthis is not a pdf".to_vec()).await;
        assert!(result.analysis.is_empty());
    }
}
