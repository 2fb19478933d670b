//! services/api/src/adapters/webhook.rs
//!
//! This module contains the adapter for the external inference webhook.
//! It implements the `InferenceService` port from the `core` crate. The
//! webhook is one opaque endpoint: posting a multipart form runs document
//! analysis, posting JSON runs question answering. Nothing is known about
//! what sits behind it, so all intelligence here is in normalizing its
//! loosely shaped responses.

use async_trait::async_trait;
use chrono::Utc;
use docchat_core::domain::DocumentAnalysis;
use docchat_core::ports::{InferenceService, PortError, PortResult};
use serde_json::Value;

/// Answer text used when the webhook responds 2xx but in neither of the
/// recognized shapes. Shape divergence is "answer unavailable", never a
/// hard failure.
pub const FALLBACK_ANSWER: &str =
    "I'm not sure how to answer that. Could you be more specific?";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `InferenceService` against the configured
/// webhook URL.
///
/// No request timeout is set. A hung webhook call leaves that one operation
/// pending; retries are user-initiated.
#[derive(Clone)]
pub struct WebhookAdapter {
    client: reqwest::Client,
    url: String,
}

impl WebhookAdapter {
    /// Creates a new `WebhookAdapter` for the given endpoint URL.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

//=========================================================================================
// Response Normalization
//=========================================================================================

/// Normalizes an analysis response. The contract is a non-empty JSON array
/// whose first element may carry `Summary`, `totalPages`, `totalWords`,
/// `language`, and `ocr`; absent or mistyped fields take defaults, and
/// counts beyond `u32` range saturate. Anything that is not a non-empty
/// array is an incomplete analysis.
fn parse_analysis(value: &Value) -> Option<DocumentAnalysis> {
    let first = value.as_array()?.first()?;
    Some(DocumentAnalysis {
        summary: first
            .get("Summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        page_count: first
            .get("totalPages")
            .and_then(Value::as_u64)
            .map_or(0, |pages| u32::try_from(pages).unwrap_or(u32::MAX)),
        word_count: first
            .get("totalWords")
            .and_then(Value::as_u64)
            .map_or(0, |words| u32::try_from(words).unwrap_or(u32::MAX)),
        language: first
            .get("language")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string(),
        extracted_text: first
            .get("ocr")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Extracts the answer text from either recognized response shape: an array
/// whose first element has `output.answer`, or a bare object with
/// `output.answer`. Everything else becomes the fixed fallback prompt.
fn extract_answer(value: &Value) -> String {
    let candidate = match value.as_array() {
        Some(items) => items.first().unwrap_or(&Value::Null),
        None => value,
    };
    candidate
        .get("output")
        .and_then(|output| output.get("answer"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_ANSWER.to_string())
}

/// Builds the failure message for a non-2xx response, preferring a JSON
/// `message` field over the raw body.
fn describe_failure(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    if detail.is_empty() {
        format!("webhook returned status {status}")
    } else {
        format!("webhook returned status {status}: {detail}")
    }
}

//=========================================================================================
// `InferenceService` Trait Implementation
//=========================================================================================

#[async_trait]
impl InferenceService for WebhookAdapter {
    async fn analyze_document(
        &self,
        file_name: &str,
        pdf: &[u8],
        owner_email: &str,
    ) -> PortResult<DocumentAnalysis> {
        let part = reqwest::multipart::Part::bytes(pdf.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| PortError::Webhook(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("pdf", part)
            .text("userEmail", owner_email.to_string());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Webhook(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Webhook(describe_failure(status.as_u16(), &body)));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| PortError::Webhook(e.to_string()))?;
        parse_analysis(&value).ok_or(PortError::IncompleteAnalysis)
    }

    async fn answer(
        &self,
        message: &str,
        document_ids: &[i64],
        owner_email: &str,
    ) -> PortResult<String> {
        let payload = serde_json::json!({
            "message": message,
            "pdfIds": document_ids,
            "userEmail": owner_email,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Webhook(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Webhook(describe_failure(status.as_u16(), &body)));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| PortError::Webhook(e.to_string()))?;
        Ok(extract_answer(&value))
    }
}
