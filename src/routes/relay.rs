// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Receipt relay route: upload a PDF, get back its text and payment fields.

use crate::error::{AppError, Result};
use crate::services::ReceiptAnalysis;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Multipart framing overhead allowed on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/extract-text", post(extract_text))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTextResponse {
    pub success: bool,
    pub filename: String,
    pub extracted_text: String,
    pub analysis: ReceiptAnalysis,
    pub message: String,
}

struct Upload {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large".to_string())
    } else {
        AppError::BadRequest(format!("Malformed multipart body: {}", e.body_text()))
    }
}

/// Read the `file` field, ignoring any others.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?.to_vec();

        return Ok(Upload {
            filename,
            content_type,
            data,
        });
    }

    Err(AppError::BadRequest(
        "Missing form field 'file'".to_string(),
    ))
}

/// Extract text and payment fields from an uploaded PDF receipt.
async fn extract_text(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ExtractTextResponse>> {
    let upload = read_upload(&mut multipart).await?;

    state.receipt_service.validate_upload(
        &upload.filename,
        upload.content_type.as_deref(),
        &upload.data,
    )?;

    tracing::info!(
        filename = %upload.filename,
        bytes = upload.data.len(),
        "Processing receipt"
    );

    let extraction = state.receipt_service.process(upload.data).await;

    let message = if extraction.text.trim().is_empty() {
        "No text could be extracted from the PDF"
    } else if extraction.analysis.is_empty() {
        "Text extracted; no payment details recognized"
    } else {
        "Text extracted and analyzed successfully"
    };

    tracing::info!(
        filename = %upload.filename,
        text_chars = extraction.text.len(),
        analyzed = !extraction.analysis.is_empty(),
        "Receipt processed"
    );

    Ok(Json(ExtractTextResponse {
        success: true,
        filename: upload.filename,
        extracted_text: extraction.text,
        analysis: extraction.analysis,
        message: message.to_string(),
    }))
}
