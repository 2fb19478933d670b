//! services/api/src/web/chat.rs
//!
//! Axum handlers for chat: posting a turn, listing past sessions, and
//! reconstructing one session's thread.
//!
//! A session has no row of its own. It opens when the first message is
//! posted without a chat id, exists as the set of rows sharing the minted
//! id, and ends only by the client ceasing to post to it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use docchat_core::cache::CachedMessage;
use docchat_core::domain::{ChatMessage, NewChatMessage, Sender};
use docchat_core::history::{summarize, thread_document_ids, ChatSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

/// Reply text persisted and rendered when the webhook call for a turn
/// fails. The turn degrades; it never loses the user's message.
pub const TURN_FAILURE_APOLOGY: &str =
    "Sorry, something went wrong while answering. Please try again.";

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub message: String,
    /// Absent to open a new session; present to continue one.
    pub chat_id: Option<Uuid>,
    /// Documents for a new session. Ignored when continuing: the session's
    /// set was fixed by its first message.
    #[serde(default)]
    pub pdf_ids: Vec<i64>,
}

/// One persisted chat-log row as rendered to clients.
#[derive(Serialize, ToSchema)]
pub struct ChatMessageView {
    pub id: i64,
    pub chat_id: Uuid,
    pub sender: String,
    pub text: String,
    pub document_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageView {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender: message.sender.as_str().to_string(),
            text: message.text,
            document_ids: message.document_ids,
            created_at: message.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SendMessageResponse {
    pub chat_id: Uuid,
    pub user_message: ChatMessageView,
    pub reply: ChatMessageView,
    /// True when the webhook call failed and the reply is the fixed
    /// apology. The exchange is persisted either way.
    pub turn_failed: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ChatSummaryView {
    pub chat_id: Uuid,
    pub document_ids: Vec<i64>,
    pub last_message: String,
    pub last_sender: String,
    pub last_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<ChatSummary> for ChatSummaryView {
    fn from(summary: ChatSummary) -> Self {
        Self {
            chat_id: summary.chat_id,
            document_ids: summary.document_ids,
            last_message: summary.last_message,
            last_sender: summary.last_sender.as_str().to_string(),
            last_at: summary.last_at,
            message_count: summary.message_count,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChatThreadResponse {
    pub chat_id: Uuid,
    /// The session's document set, from its first persisted row.
    pub document_ids: Vec<i64>,
    /// Display names for the ids. A document deleted since the session
    /// started drops out of this list but stays in `document_ids`.
    pub document_names: Vec<String>,
    pub messages: Vec<ChatMessageView>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Post one chat turn.
///
/// The pipeline is sequential and fully awaited: persist the user's
/// message, ask the webhook, persist the reply. A webhook failure turns
/// into the apology reply and a `turn_failed` flag rather than an error;
/// a store failure fails the request loudly.
#[utoipa::path(
    post,
    path = "/chats/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "The persisted exchange", body = SendMessageResponse),
        (status = 400, description = "Empty message or no documents for a new chat"),
        (status = 404, description = "Unknown chat id or document id for this caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let text = req.message.trim();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message must not be empty".to_string()));
    }

    // 1. Resolve the session: continue an existing thread or open a new one.
    let (chat_id, document_ids) = match req.chat_id {
        Some(chat_id) => {
            let thread = state
                .chat_log
                .thread(&owner_email, chat_id)
                .await
                .map_err(|e| {
                    error!("Failed to load chat {}: {:?}", chat_id, e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to load chat".to_string(),
                    )
                })?;
            if thread.is_empty() {
                return Err((StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id)));
            }
            (chat_id, thread_document_ids(&thread))
        }
        None => {
            if req.pdf_ids.is_empty() {
                return Err((
                    StatusCode::BAD_REQUEST,
                    "A new chat needs at least one document".to_string(),
                ));
            }
            for &id in &req.pdf_ids {
                let found = state
                    .documents
                    .document_by_id(&owner_email, id)
                    .await
                    .map_err(|e| {
                        error!("Failed to check document {}: {:?}", id, e);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Failed to check documents".to_string(),
                        )
                    })?;
                if found.is_none() {
                    return Err((StatusCode::NOT_FOUND, format!("Document {} not found", id)));
                }
            }
            (Uuid::new_v4(), req.pdf_ids)
        }
    };

    // 2. Persist the user's message before anything else touches the
    //    network. A failure here fails the whole turn.
    let user_row = state
        .chat_log
        .append_message(NewChatMessage {
            chat_id,
            owner_email: owner_email.clone(),
            sender: Sender::User,
            text: text.to_string(),
            document_ids: document_ids.clone(),
        })
        .await
        .map_err(|e| {
            error!("Failed to persist user message: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save message".to_string(),
            )
        })?;

    // 3. Ask the webhook. Failure degrades the turn; the user's message is
    //    already safe.
    let (reply_text, turn_failed) = match state
        .inference
        .answer(text, &document_ids, &owner_email)
        .await
    {
        Ok(answer) => (answer, false),
        Err(e) => {
            error!("Chat answer failed: {:?}", e);
            (TURN_FAILURE_APOLOGY.to_string(), true)
        }
    };

    // 4. Persist the reply, apology included, so reconstruction reproduces
    //    exactly what was rendered.
    let reply_row = state
        .chat_log
        .append_message(NewChatMessage {
            chat_id,
            owner_email: owner_email.clone(),
            sender: Sender::Ai,
            text: reply_text,
            document_ids: document_ids.clone(),
        })
        .await
        .map_err(|e| {
            error!("Failed to persist reply: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save reply".to_string(),
            )
        })?;

    // 5. Mirror both sides into the per-document cache threads.
    {
        let mut cache = state.chat_cache.write().await;
        for &document_id in &document_ids {
            cache.append(document_id, CachedMessage::now(Sender::User, user_row.text.clone()));
            cache.append(document_id, CachedMessage::now(Sender::Ai, reply_row.text.clone()));
        }
    }

    Ok(Json(SendMessageResponse {
        chat_id,
        user_message: user_row.into(),
        reply: reply_row.into(),
        turn_failed,
    }))
}

/// List the caller's chat sessions, newest activity first.
///
/// This folds over the owner's full message set; the summaries are not a
/// store-side aggregation.
#[utoipa::path(
    get,
    path = "/chats",
    responses(
        (status = 200, description = "Per-session summaries", body = [ChatSummaryView]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_chats_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rows = state
        .chat_log
        .messages_for_owner(&owner_email)
        .await
        .map_err(|e| {
            error!("Failed to load chat history: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load chat history".to_string(),
            )
        })?;

    let summaries: Vec<ChatSummaryView> = summarize(rows)
        .into_iter()
        .map(ChatSummaryView::from)
        .collect();
    Ok(Json(summaries))
}

/// Reconstruct one session's thread in creation order.
#[utoipa::path(
    get,
    path = "/chats/{chat_id}",
    params(("chat_id" = Uuid, Path, description = "The chat session id.")),
    responses(
        (status = 200, description = "The full thread", body = ChatThreadResponse),
        (status = 404, description = "No such chat for this caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner_email): Extension<String>,
    Path(chat_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let thread = state
        .chat_log
        .thread(&owner_email, chat_id)
        .await
        .map_err(|e| {
            error!("Failed to load chat {}: {:?}", chat_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load chat".to_string(),
            )
        })?;
    // Zero rows and a foreign owner's chat id look identical from here.
    if thread.is_empty() {
        return Err((StatusCode::NOT_FOUND, format!("Chat {} not found", chat_id)));
    }

    let document_ids = thread_document_ids(&thread);
    let mut document_names = Vec::new();
    for &id in &document_ids {
        let found = state
            .documents
            .document_by_id(&owner_email, id)
            .await
            .map_err(|e| {
                error!("Failed to resolve document {}: {:?}", id, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to resolve documents".to_string(),
                )
            })?;
        if let Some(doc) = found {
            document_names.push(doc.name);
        }
    }

    Ok(Json(ChatThreadResponse {
        chat_id,
        document_ids,
        document_names,
        messages: thread.into_iter().map(ChatMessageView::from).collect(),
    }))
}
