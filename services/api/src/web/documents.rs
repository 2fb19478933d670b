//! services/api/src/web/documents.rs
//!
//! Axum handlers for the document endpoints: the upload/analysis pipeline
//! and the owner-scoped CRUD surface, plus the cache-backed per-document
//! message view.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use docchat_core::cache::CachedMessage;
use docchat_core::domain::{Document, DocumentUpdate};
use docchat_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Full view of one stored document, extracted text included.
#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub page_count: u32,
    pub word_count: u32,
    pub language: String,
    pub extracted_text: String,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            summary: doc.summary,
            page_count: doc.page_count,
            word_count: doc.word_count,
            language: doc.language,
            extracted_text: doc.extracted_text,
            created_at: doc.created_at,
        }
    }
}

/// List row: metadata plus the chat cache's last-message preview. The
/// extracted text is omitted here; it can be large.
#[derive(Serialize, ToSchema)]
pub struct DocumentListItem {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub page_count: u32,
    pub word_count: u32,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentListItem>,
    pub total: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateDocumentRequest {
    pub name: Option<String>,
    pub summary: Option<String>,
}

/// One line of the cache-backed per-document thread. Ids here are render
/// keys, not store row ids.
#[derive(Serialize, ToSchema)]
pub struct CachedMessageView {
    pub id: String,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<CachedMessage> for CachedMessageView {
    fn from(message: CachedMessage) -> Self {
        Self {
            id: message.id,
            sender: message.sender.as_str().to_string(),
            text: message.text,
            timestamp: message.timestamp,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Upload a PDF for analysis.
///
/// Accepts a multipart/form-data request with a `pdf` file part. The file is
/// forwarded to the inference webhook; the normalized metadata is stored and
/// returned with the assigned id. Nothing is written on any failure path.
#[utoipa::path(
    post,
    path = "/documents",
    request_body(content_type = "multipart/form-data", description = "The PDF to upload."),
    responses(
        (status = 201, description = "Document analyzed and stored", body = DocumentResponse),
        (status = 400, description = "Multipart form has no pdf part"),
        (status = 415, description = "The uploaded file is not a PDF"),
        (status = 422, description = "The webhook returned no usable metadata"),
        (status = 502, description = "The webhook call failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Pull the pdf part out of the form.
    let mut upload: Option<(String, bytes::Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        if field.name() != Some("pdf") {
            continue;
        }
        // The declared media type is checked before anything leaves the
        // server; a mismatch never reaches the webhook.
        if field.content_type() != Some("application/pdf") {
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Only PDF files are accepted".to_string(),
            ));
        }
        let file_name = field.file_name().unwrap_or("untitled.pdf").to_string();
        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes: {}", e),
            )
        })?;
        upload = Some((file_name, data));
        break;
    }
    let (file_name, data) = upload.ok_or((
        StatusCode::BAD_REQUEST,
        "Multipart form must include a pdf file".to_string(),
    ))?;

    // 2. Forward to the inference webhook and normalize its response.
    let analysis = state
        .inference
        .analyze_document(&file_name, &data, &owner_email)
        .await
        .map_err(|e| match e {
            PortError::IncompleteAnalysis => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Analysis returned no usable metadata".to_string(),
            ),
            PortError::Webhook(msg) => {
                error!("Document analysis failed: {}", msg);
                (StatusCode::BAD_GATEWAY, format!("Upload failed: {}", msg))
            }
            other => {
                error!("Document analysis failed: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to analyze document".to_string(),
                )
            }
        })?;

    // 3. Persist the normalized metadata.
    let document = state
        .documents
        .insert_document(&owner_email, &file_name, &analysis)
        .await
        .map_err(|e| {
            error!("Failed to store document: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store document".to_string(),
            )
        })?;

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

/// List the caller's documents, newest first, with chat previews.
#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "The caller's documents", body = DocumentListResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let documents = state
        .documents
        .documents_for_owner(&owner_email)
        .await
        .map_err(|e| {
            error!("Failed to list documents: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list documents".to_string(),
            )
        })?;
    let total = state
        .documents
        .count_for_owner(&owner_email)
        .await
        .map_err(|e| {
            error!("Failed to count documents: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to count documents".to_string(),
            )
        })?;

    let cache = state.chat_cache.read().await;
    let documents = documents
        .into_iter()
        .map(|doc| DocumentListItem {
            last_message: cache.last_message(doc.id),
            last_activity: cache.last_activity(doc.id),
            id: doc.id,
            name: doc.name,
            summary: doc.summary,
            page_count: doc.page_count,
            word_count: doc.word_count,
            language: doc.language,
            created_at: doc.created_at,
        })
        .collect();

    Ok(Json(DocumentListResponse { documents, total }))
}

/// Fetch one document by id.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    params(("id" = i64, Path, description = "The document id.")),
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "No such document for this caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state
        .documents
        .document_by_id(&owner_email, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch document {}: {:?}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch document".to_string(),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("Document {} not found", id),
        ))?;
    Ok(Json(DocumentResponse::from(document)))
}

/// Rename a document or replace its summary.
#[utoipa::path(
    patch,
    path = "/documents/{id}",
    params(("id" = i64, Path, description = "The document id.")),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "The updated document", body = DocumentResponse),
        (status = 404, description = "No such document for this caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let update = DocumentUpdate {
        name: req.name,
        summary: req.summary,
    };
    let document = state
        .documents
        .update_document(&owner_email, id, &update)
        .await
        .map_err(|e| match e {
            PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            other => {
                error!("Failed to update document {}: {:?}", id, other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to update document".to_string(),
                )
            }
        })?;
    Ok(Json(DocumentResponse::from(document)))
}

/// Delete a document.
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    params(("id" = i64, Path, description = "The document id.")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such document for this caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .documents
        .delete_document(&owner_email, id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            other => {
                error!("Failed to delete document {}: {:?}", id, other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to delete document".to_string(),
                )
            }
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// The cache-backed chat thread for one document.
///
/// The first visit seeds the thread with the greeting; later visits return
/// whatever the process has buffered since. This view does not survive a
/// restart - the persisted chat log does.
#[utoipa::path(
    get,
    path = "/documents/{id}/messages",
    params(("id" = i64, Path, description = "The document id.")),
    responses(
        (status = 200, description = "The buffered thread", body = [CachedMessageView]),
        (status = 404, description = "No such document for this caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn document_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = state
        .documents
        .document_by_id(&owner_email, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch document {}: {:?}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch document".to_string(),
            )
        })?
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("Document {} not found", id),
        ))?;

    let mut cache = state.chat_cache.write().await;
    cache.initialize(document.id, &document.name);
    let messages: Vec<CachedMessageView> = cache
        .messages(document.id)
        .into_iter()
        .map(CachedMessageView::from)
        .collect();

    Ok(Json(messages))
}
